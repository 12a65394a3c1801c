//! In-memory chunk store with a linear cosine scan.
//!
//! Behaviorally equivalent to a vector-capable database for the corpus
//! sizes a single document produces, and the backend of choice for tests
//! and demos.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{ChunkStore, StoredChunk};
use crate::embeddings::cosine_similarity;
use crate::types::RagError;

#[derive(Default)]
struct State {
    chunks: HashMap<String, Vec<StoredChunk>>,
    /// Locked to the first inserted embedding's width; mixing embedding
    /// models in one store is rejected.
    dimensions: Option<usize>,
}

/// Thread-safe in-memory backend.
#[derive(Default)]
pub struct InMemoryChunkStore {
    state: RwLock<State>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn insert_chunks(&self, chunks: Vec<StoredChunk>) -> Result<(), RagError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let width = chunks[0].embedding.len();
        for chunk in &chunks {
            if chunk.embedding.len() != width {
                return Err(RagError::Validation(format!(
                    "mixed embedding dimensions in batch: {} vs {width}",
                    chunk.embedding.len()
                )));
            }
            if !chunk.embedding.iter().all(|v| v.is_finite()) {
                return Err(RagError::Validation(format!(
                    "non-finite embedding component in chunk {}",
                    chunk.id
                )));
            }
        }

        let mut state = self.state.write();
        match state.dimensions {
            None => state.dimensions = Some(width),
            Some(existing) if existing != width => {
                return Err(RagError::Validation(format!(
                    "embedding dimensions {width} do not match store dimensions {existing}"
                )));
            }
            Some(_) => {}
        }

        for chunk in chunks {
            state
                .chunks
                .entry(chunk.document_id.clone())
                .or_default()
                .push(chunk);
        }
        Ok(())
    }

    async fn count_chunks(&self, document_id: &str) -> Result<usize, RagError> {
        Ok(self
            .state
            .read()
            .chunks
            .get(document_id)
            .map_or(0, Vec::len))
    }

    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<StoredChunk>, RagError> {
        let mut chunks = self
            .state
            .read()
            .chunks
            .get(document_id)
            .cloned()
            .unwrap_or_default();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn delete_document(&self, document_id: &str) -> Result<usize, RagError> {
        Ok(self
            .state
            .write()
            .chunks
            .remove(document_id)
            .map_or(0, |removed| removed.len()))
    }

    async fn search_similar(
        &self,
        document_id: &str,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<(StoredChunk, f32)>, RagError> {
        let state = self.state.read();
        let Some(chunks) = state.chunks.get(document_id) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(StoredChunk, f32)> = chunks
            .iter()
            .map(|chunk| (chunk.clone(), cosine_similarity(&chunk.embedding, query)))
            .filter(|(_, similarity)| *similarity >= threshold)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::TextChunk;

    fn chunk(document_id: &str, index: usize, embedding: Vec<f32>) -> StoredChunk {
        StoredChunk::from_chunk(
            document_id,
            TextChunk {
                content: format!("chunk body {index}"),
                chunk_index: index,
                token_count: 4,
                page_number: None,
            },
            embedding,
        )
    }

    #[tokio::test]
    async fn search_orders_by_similarity_and_honors_threshold() {
        let store = InMemoryChunkStore::new();
        store
            .insert_chunks(vec![
                chunk("doc", 0, vec![1.0, 0.0, 0.0]),
                chunk("doc", 1, vec![0.7, 0.7, 0.0]),
                chunk("doc", 2, vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store
            .search_similar("doc", &[1.0, 0.0, 0.0], 0.5, 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.chunk_index, 0);
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
        assert!(hits[0].1 >= hits[1].1);
    }

    #[tokio::test]
    async fn unknown_document_returns_empty_not_error() {
        let store = InMemoryChunkStore::new();
        let hits = store
            .search_similar("missing", &[1.0, 0.0], 0.0, 5)
            .await
            .unwrap();
        assert!(hits.is_empty());
        assert_eq!(store.count_chunks("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn limit_caps_result_count() {
        let store = InMemoryChunkStore::new();
        let chunks = (0..10)
            .map(|i| chunk("doc", i, vec![1.0, i as f32 * 0.01]))
            .collect();
        store.insert_chunks(chunks).await.unwrap();

        let hits = store
            .search_similar("doc", &[1.0, 0.0], 0.0, 3)
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn mixed_dimensions_are_rejected() {
        let store = InMemoryChunkStore::new();
        store
            .insert_chunks(vec![chunk("doc", 0, vec![1.0, 0.0])])
            .await
            .unwrap();

        let err = store
            .insert_chunks(vec![chunk("doc", 1, vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));

        let err = store
            .insert_chunks(vec![
                chunk("other", 0, vec![1.0, 0.0]),
                chunk("other", 1, vec![1.0]),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
    }

    #[tokio::test]
    async fn non_finite_embeddings_are_rejected() {
        let store = InMemoryChunkStore::new();
        let err = store
            .insert_chunks(vec![chunk("doc", 0, vec![1.0, f32::NAN])])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
        assert_eq!(store.count_chunks("doc").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn chunks_for_document_come_back_in_index_order() {
        let store = InMemoryChunkStore::new();
        store
            .insert_chunks(vec![
                chunk("doc", 2, vec![0.0, 1.0]),
                chunk("doc", 0, vec![1.0, 0.0]),
                chunk("doc", 1, vec![0.5, 0.5]),
            ])
            .await
            .unwrap();

        let chunks = store.chunks_for_document("doc").await.unwrap();
        let indexes: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn delete_reports_removed_count() {
        let store = InMemoryChunkStore::new();
        store
            .insert_chunks(vec![
                chunk("doc", 0, vec![1.0, 0.0]),
                chunk("doc", 1, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete_document("doc").await.unwrap(), 2);
        assert_eq!(store.delete_document("doc").await.unwrap(), 0);
    }
}
