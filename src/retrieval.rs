//! Query-time retrieval: embed the question, search the document's chunks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::stores::ChunkStore;
use crate::types::RagError;

/// Default minimum similarity for a chunk to count as a match.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.5;
/// Default number of chunks to retrieve per query.
pub const DEFAULT_MATCH_COUNT: usize = 5;

/// Caller-tunable retrieval knobs.
///
/// A low threshold deliberately favors recall over precision for short or
/// ambiguous queries; the chat orchestrator runs at 0.1 for exactly that
/// reason.
#[derive(Clone, Copy, Debug)]
pub struct RetrievalOptions {
    pub threshold: f32,
    pub count: usize,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            count: DEFAULT_MATCH_COUNT,
        }
    }
}

/// A chunk pulled back for one query, with its similarity score.
///
/// Ephemeral: computed per query, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub chunk_index: usize,
    pub page_number: Option<u32>,
    pub similarity: f32,
}

impl RetrievedChunk {
    /// Citation projection for surfacing sources to the caller.
    pub fn citation(&self) -> SourceCitation {
        SourceCitation {
            chunk_index: self.chunk_index,
            page_number: self.page_number,
            relevance_pct: (self.similarity * 100.0).round() as i32,
        }
    }
}

/// Provenance record attached to an answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub chunk_index: usize,
    pub page_number: Option<u32>,
    /// `round(similarity * 100)`.
    pub relevance_pct: i32,
}

/// Aggregate similarity statistics for one retrieval.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RetrievalStats {
    pub total_chunks: usize,
    pub avg_similarity: f32,
    pub min_similarity: f32,
    pub max_similarity: f32,
    pub pages_covered: Vec<u32>,
}

/// Embeds queries and delegates scoped nearest-neighbor search to the store.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn ChunkStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn ChunkStore>) -> Self {
        Self { embedder, store }
    }

    /// The chunk store this retriever searches.
    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    /// Retrieves up to `options.count` chunks of `document_id` whose cosine
    /// similarity to `query` clears `options.threshold`, descending by
    /// similarity.
    ///
    /// Zero matches is a valid empty result; embedding or storage failures
    /// are errors.
    pub async fn retrieve(
        &self,
        query: &str,
        document_id: &str,
        options: RetrievalOptions,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        let query_embedding = self.embedder.embed(query).await?;

        let matches = self
            .store
            .search_similar(
                document_id,
                &query_embedding.embedding,
                options.threshold,
                options.count,
            )
            .await?;

        let retrieved: Vec<RetrievedChunk> = matches
            .into_iter()
            .map(|(chunk, similarity)| RetrievedChunk {
                id: chunk.id,
                document_id: chunk.document_id,
                content: chunk.content,
                chunk_index: chunk.chunk_index,
                page_number: chunk.page_number,
                similarity,
            })
            .collect();

        debug!(
            document_id,
            query_chars = query.chars().count(),
            matches = retrieved.len(),
            similarities = ?retrieved.iter().map(|c| c.similarity).collect::<Vec<_>>(),
            "retrieved chunks"
        );

        Ok(retrieved)
    }
}

/// Formats retrieved chunks as numbered, human-readable source lines,
/// e.g. `[1] Page 3 (87% relevant)`.
pub fn format_chunk_sources(chunks: &[RetrievedChunk]) -> Vec<String> {
    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| {
            let page = match chunk.page_number {
                Some(page) => format!("Page {page}"),
                None => "Unknown page".to_string(),
            };
            let relevance = (chunk.similarity * 100.0).round() as i32;
            format!("[{}] {page} ({relevance}% relevant)", index + 1)
        })
        .collect()
}

/// Summarizes one retrieval for logging and debugging.
pub fn retrieval_stats(chunks: &[RetrievedChunk]) -> RetrievalStats {
    if chunks.is_empty() {
        return RetrievalStats::default();
    }

    let similarities: Vec<f32> = chunks.iter().map(|c| c.similarity).collect();
    let sum: f32 = similarities.iter().sum();

    let mut pages_covered: Vec<u32> = chunks.iter().filter_map(|c| c.page_number).collect();
    pages_covered.sort_unstable();
    pages_covered.dedup();

    RetrievalStats {
        total_chunks: chunks.len(),
        avg_similarity: (sum / chunks.len() as f32 * 100.0).round() / 100.0,
        min_similarity: similarities.iter().copied().fold(f32::INFINITY, f32::min),
        max_similarity: similarities
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max),
        pages_covered,
    }
}
