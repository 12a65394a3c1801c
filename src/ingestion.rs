//! Document ingestion: chunk, filter, embed, persist.

use std::sync::Arc;

use tracing::{info, warn};

use crate::chunking::{
    ChunkingStats, DEFAULT_OVERLAP_TOKENS, DEFAULT_TARGET_TOKENS, PageText, TextChunk,
    chunk_pages, chunk_text, chunking_stats, is_valid_chunk,
};
use crate::embeddings::{
    DEFAULT_EMBED_BATCH_SIZE, EmbeddingProvider, embed_in_batches, estimate_embedding_cost,
    is_valid_embedding,
};
use crate::stores::{ChunkStore, StoredChunk};
use crate::types::{RagError, ServiceErrorKind};

/// Chunking and batching parameters for ingestion.
#[derive(Clone, Copy, Debug)]
pub struct IngestionConfig {
    pub target_tokens: usize,
    pub overlap_tokens: usize,
    pub embed_batch_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            target_tokens: DEFAULT_TARGET_TOKENS,
            overlap_tokens: DEFAULT_OVERLAP_TOKENS,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
        }
    }
}

/// Result of one ingestion run.
#[derive(Clone, Debug, PartialEq)]
pub struct IngestionOutcome {
    pub document_id: String,
    /// True when the document already had chunks and nothing was done.
    pub already_ingested: bool,
    pub chunk_stats: ChunkingStats,
    /// Chunks dropped by the validity filter before embedding.
    pub skipped_chunks: usize,
    pub embedding_tokens: u64,
    pub estimated_cost: f64,
}

/// Single-flow ingestion pipeline: chunk → filter → embed → persist.
///
/// Ingestion is idempotent per document: when chunks already exist the run
/// degrades to a cheap no-op success instead of re-embedding or corrupting
/// the stored set.
pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn ChunkStore>,
    config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn ChunkStore>) -> Self {
        Self {
            embedder,
            store,
            config: IngestionConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: IngestionConfig) -> Self {
        self.config = config;
        self
    }

    /// Ingests a document from its full extracted text.
    pub async fn ingest(&self, document_id: &str, text: &str) -> Result<IngestionOutcome, RagError> {
        let chunks = chunk_text(text, self.config.target_tokens, self.config.overlap_tokens);
        self.ingest_chunks(document_id, chunks).await
    }

    /// Ingests a document from per-page extractor output, preserving page
    /// provenance on every chunk.
    pub async fn ingest_pages(
        &self,
        document_id: &str,
        pages: &[PageText],
    ) -> Result<IngestionOutcome, RagError> {
        let chunks = chunk_pages(pages, self.config.target_tokens, self.config.overlap_tokens);
        self.ingest_chunks(document_id, chunks).await
    }

    async fn ingest_chunks(
        &self,
        document_id: &str,
        chunks: Vec<TextChunk>,
    ) -> Result<IngestionOutcome, RagError> {
        let existing = self.store.count_chunks(document_id).await?;
        if existing > 0 {
            info!(document_id, existing, "chunks already generated, skipping");
            return Ok(IngestionOutcome {
                document_id: document_id.to_string(),
                already_ingested: true,
                chunk_stats: ChunkingStats {
                    total_chunks: existing,
                    ..ChunkingStats::default()
                },
                skipped_chunks: 0,
                embedding_tokens: 0,
                estimated_cost: 0.0,
            });
        }

        let total = chunks.len();
        let valid: Vec<TextChunk> = chunks.into_iter().filter(is_valid_chunk).collect();
        let skipped = total - valid.len();
        if valid.is_empty() {
            warn!(document_id, total, "every chunk failed the validity filter");
            return Err(RagError::NoUsableContent);
        }

        let stats = chunking_stats(&valid);
        let texts: Vec<String> = valid.iter().map(|chunk| chunk.content.clone()).collect();
        let batch = embed_in_batches(&self.embedder, &texts, self.config.embed_batch_size).await?;

        if batch.embeddings.len() != valid.len() {
            return Err(RagError::EmbeddingService {
                kind: ServiceErrorKind::Other,
                message: format!(
                    "expected {} embeddings, provider returned {}",
                    valid.len(),
                    batch.embeddings.len()
                ),
            });
        }
        let dimensions = self.embedder.dimensions();
        for embedding in &batch.embeddings {
            if !is_valid_embedding(embedding, dimensions) {
                return Err(RagError::EmbeddingService {
                    kind: ServiceErrorKind::Other,
                    message: format!("provider returned an invalid {dimensions}-dim embedding"),
                });
            }
        }

        let stored: Vec<StoredChunk> = valid
            .into_iter()
            .zip(batch.embeddings)
            .map(|(chunk, embedding)| StoredChunk::from_chunk(document_id, chunk, embedding))
            .collect();

        // One store call: a failed batch persists nothing.
        self.store.insert_chunks(stored).await?;

        info!(
            document_id,
            chunks = stats.total_chunks,
            skipped,
            embedding_tokens = batch.total_tokens,
            "document ingested"
        );

        Ok(IngestionOutcome {
            document_id: document_id.to_string(),
            already_ingested: false,
            chunk_stats: stats,
            skipped_chunks: skipped,
            embedding_tokens: batch.total_tokens,
            estimated_cost: estimate_embedding_cost(batch.total_tokens),
        })
    }
}
