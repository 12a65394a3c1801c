//! Integration tests for the sqlite-vec backed chunk store.

use papertalk::chunking::TextChunk;
use papertalk::stores::{ChunkStore, SqliteChunkStore, StoredChunk};
use papertalk::types::RagError;
use tempfile::tempdir;

fn chunk(document_id: &str, index: usize, embedding: Vec<f32>) -> StoredChunk {
    StoredChunk::from_chunk(
        document_id,
        TextChunk {
            content: format!("stored chunk {index}"),
            chunk_index: index,
            token_count: 4,
            page_number: if index % 2 == 0 { Some(index as u32 + 1) } else { None },
        },
        embedding,
    )
}

#[tokio::test]
async fn insert_and_search_orders_by_similarity() {
    let store = SqliteChunkStore::open_in_memory().await.unwrap();
    store
        .insert_chunks(vec![
            chunk("doc", 0, vec![1.0, 0.0, 0.0, 0.0]),
            chunk("doc", 1, vec![0.8, 0.6, 0.0, 0.0]),
            chunk("doc", 2, vec![0.0, 0.0, 1.0, 0.0]),
        ])
        .await
        .unwrap();

    let hits = store
        .search_similar("doc", &[1.0, 0.0, 0.0, 0.0], 0.5, 5)
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].0.chunk_index, 0);
    assert!((hits[0].1 - 1.0).abs() < 1e-4);
    assert_eq!(hits[1].0.chunk_index, 1);
    assert!(hits[0].1 >= hits[1].1);
}

#[tokio::test]
async fn search_is_scoped_to_one_document() {
    let store = SqliteChunkStore::open_in_memory().await.unwrap();
    store
        .insert_chunks(vec![
            chunk("doc-a", 0, vec![1.0, 0.0, 0.0, 0.0]),
            chunk("doc-b", 0, vec![1.0, 0.0, 0.0, 0.0]),
        ])
        .await
        .unwrap();

    let hits = store
        .search_similar("doc-a", &[1.0, 0.0, 0.0, 0.0], 0.0, 10)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0.document_id, "doc-a");

    let hits = store
        .search_similar("doc-missing", &[1.0, 0.0, 0.0, 0.0], 0.0, 10)
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn chunks_come_back_in_index_order_with_pages() {
    let store = SqliteChunkStore::open_in_memory().await.unwrap();
    store
        .insert_chunks(vec![
            chunk("doc", 2, vec![0.0, 1.0, 0.0, 0.0]),
            chunk("doc", 0, vec![1.0, 0.0, 0.0, 0.0]),
            chunk("doc", 1, vec![0.0, 0.0, 1.0, 0.0]),
        ])
        .await
        .unwrap();

    let chunks = store.chunks_for_document("doc").await.unwrap();
    let indexes: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indexes, vec![0, 1, 2]);
    assert_eq!(chunks[0].page_number, Some(1));
    assert_eq!(chunks[1].page_number, None);
    assert_eq!(chunks[0].embedding, vec![1.0, 0.0, 0.0, 0.0]);
}

#[tokio::test]
async fn count_and_delete_round_trip() {
    let store = SqliteChunkStore::open_in_memory().await.unwrap();
    assert_eq!(store.count_chunks("doc").await.unwrap(), 0);

    store
        .insert_chunks(vec![
            chunk("doc", 0, vec![1.0, 0.0, 0.0, 0.0]),
            chunk("doc", 1, vec![0.0, 1.0, 0.0, 0.0]),
        ])
        .await
        .unwrap();
    assert_eq!(store.count_chunks("doc").await.unwrap(), 2);

    assert_eq!(store.delete_document("doc").await.unwrap(), 2);
    assert_eq!(store.count_chunks("doc").await.unwrap(), 0);
}

#[tokio::test]
async fn mixed_dimensions_for_a_document_are_rejected() {
    let store = SqliteChunkStore::open_in_memory().await.unwrap();
    store
        .insert_chunks(vec![chunk("doc", 0, vec![1.0, 0.0, 0.0, 0.0])])
        .await
        .unwrap();

    let err = store
        .insert_chunks(vec![chunk("doc", 1, vec![1.0, 0.0])])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Validation(_)));
    assert_eq!(store.count_chunks("doc").await.unwrap(), 1);
}

#[tokio::test]
async fn database_file_persists_across_reopens() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chunks.db");

    {
        let store = SqliteChunkStore::open(&path).await.unwrap();
        store
            .insert_chunks(vec![
                chunk("doc", 0, vec![1.0, 0.0, 0.0, 0.0]),
                chunk("doc", 1, vec![0.0, 1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();
    }

    let reopened = SqliteChunkStore::open(&path).await.unwrap();
    assert_eq!(reopened.count_chunks("doc").await.unwrap(), 2);

    let hits = reopened
        .search_similar("doc", &[0.0, 1.0, 0.0, 0.0], 0.5, 5)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0.chunk_index, 1);
}
