//! Chunk/vector persistence behind a backend-agnostic trait.
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │  ChunkStore      │
//!                  │  (async, scoped) │
//!                  └────────┬─────────┘
//!                           │
//!              ┌────────────┴────────────┐
//!              ▼                         ▼
//!      ┌──────────────┐         ┌────────────────┐
//!      │  in-memory   │         │    SQLite      │
//!      │ linear scan  │         │  sqlite-vec    │
//!      └──────────────┘         └────────────────┘
//! ```
//!
//! Writes are append-only and per-document; rows are never updated in
//! place. Similarity search is always scoped to a single document id.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chunking::TextChunk;
use crate::types::RagError;

pub use memory::InMemoryChunkStore;
pub use sqlite::SqliteChunkStore;

/// A persisted chunk: the text projection plus its embedding vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub content: String,
    pub token_count: usize,
    pub page_number: Option<u32>,
    pub embedding: Vec<f32>,
}

impl StoredChunk {
    /// Pairs a chunk with its embedding under a fresh id.
    pub fn from_chunk(document_id: impl Into<String>, chunk: TextChunk, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.into(),
            chunk_index: chunk.chunk_index,
            content: chunk.content,
            token_count: chunk.token_count,
            page_number: chunk.page_number,
            embedding,
        }
    }
}

/// Storage backend for chunk/vector pairs.
///
/// Implementations must make `insert_chunks` all-or-nothing: a failed batch
/// persists no rows, so a document is either fully ingested or not at all.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Appends a batch of chunks. All-or-nothing.
    async fn insert_chunks(&self, chunks: Vec<StoredChunk>) -> Result<(), RagError>;

    /// Number of chunks persisted for a document.
    async fn count_chunks(&self, document_id: &str) -> Result<usize, RagError>;

    /// All chunks of a document, ordered by `chunk_index`.
    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<StoredChunk>, RagError>;

    /// Removes a document's chunks, returning how many were deleted.
    async fn delete_document(&self, document_id: &str) -> Result<usize, RagError>;

    /// Nearest-neighbor search by cosine similarity, scoped to one document.
    ///
    /// Returns at most `limit` rows with similarity ≥ `threshold`, ordered
    /// descending. An unknown document or an empty match set yields an
    /// empty vec, not an error.
    async fn search_similar(
        &self,
        document_id: &str,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<(StoredChunk, f32)>, RagError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_chunk_carries_projection_and_mints_ids() {
        let chunk = TextChunk {
            content: "body".into(),
            chunk_index: 3,
            token_count: 1,
            page_number: Some(7),
        };
        let a = StoredChunk::from_chunk("doc-1", chunk.clone(), vec![0.0; 4]);
        let b = StoredChunk::from_chunk("doc-1", chunk, vec![0.0; 4]);
        assert_eq!(a.document_id, "doc-1");
        assert_eq!(a.chunk_index, 3);
        assert_eq!(a.page_number, Some(7));
        assert_ne!(a.id, b.id);
    }
}
