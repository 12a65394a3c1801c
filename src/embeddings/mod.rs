//! Embedding generation: provider trait, vector math, batching helpers.

mod openai;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::types::RagError;

pub use openai::OpenAiEmbeddingProvider;

/// Vector width produced by the reference model (`text-embedding-3-small`).
pub const EMBEDDING_DIMENSIONS: usize = 1536;

/// Hard cap on inputs per embedding call, matching the hosted API limit.
/// Exceeding it is a validation error raised before any network traffic.
pub const MAX_EMBEDDING_BATCH: usize = 2048;

/// Sub-batch size used when embedding an entire document's chunks.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 100;

/// Pause between sequential sub-batches. Rate shaping, not correctness.
pub const INTER_BATCH_PAUSE: Duration = Duration::from_millis(100);

/// A single embedding plus the token usage the provider reported.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingResult {
    pub embedding: Vec<f32>,
    pub tokens: u64,
}

/// Ordered batch output; `embeddings[i]` corresponds to input `i`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchEmbeddingResult {
    pub embeddings: Vec<Vec<f32>>,
    pub total_tokens: u64,
}

/// Converts text into fixed-dimension vectors.
///
/// Implementations are injected into the retriever and ingestion pipeline as
/// `Arc<dyn EmbeddingProvider>`; there is no process-wide client.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<EmbeddingResult, RagError>;

    /// Embeds up to [`MAX_EMBEDDING_BATCH`] texts, preserving input order.
    ///
    /// A failure fails the whole batch; there is no partial success.
    async fn embed_batch(&self, texts: &[String]) -> Result<BatchEmbeddingResult, RagError>;

    /// Width of the vectors this provider produces.
    fn dimensions(&self) -> usize;
}

/// Embeds an arbitrarily long list by splitting it into sequential
/// sub-batches of `batch_size`, pausing briefly between calls to stay under
/// external throughput limits.
///
/// Any sub-batch failure aborts the whole operation.
pub async fn embed_in_batches(
    provider: &Arc<dyn EmbeddingProvider>,
    texts: &[String],
    batch_size: usize,
) -> Result<BatchEmbeddingResult, RagError> {
    if batch_size == 0 || batch_size > MAX_EMBEDDING_BATCH {
        return Err(RagError::Validation(format!(
            "embed batch size must be between 1 and {MAX_EMBEDDING_BATCH}, got {batch_size}"
        )));
    }

    let mut result = BatchEmbeddingResult::default();
    let mut batches = texts.chunks(batch_size).peekable();

    while let Some(batch) = batches.next() {
        let part = provider.embed_batch(batch).await?;
        result.embeddings.extend(part.embeddings);
        result.total_tokens += part.total_tokens;

        if batches.peek().is_some() {
            tokio::time::sleep(INTER_BATCH_PAUSE).await;
        }
    }

    Ok(result)
}

/// Checks that a vector has the expected width and only finite components.
pub fn is_valid_embedding(embedding: &[f32], dimensions: usize) -> bool {
    embedding.len() == dimensions && embedding.iter().all(|v| v.is_finite())
}

/// Cosine similarity in [-1, 1].
///
/// Returns 0.0 when either vector has zero magnitude, and 0.0 for
/// mismatched lengths; the stores reject mixed dimensions at insert time,
/// which is where that invariant is actually enforced.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude == 0.0 {
        return 0.0;
    }
    dot / magnitude
}

/// Estimated embedding spend in USD at $0.02 per million tokens.
pub fn estimate_embedding_cost(tokens: u64) -> f64 {
    (tokens as f64 / 1_000_000.0) * 0.02
}

/// Deterministic offline provider for tests and demos.
///
/// Identical texts embed to identical unit vectors; distinct texts land far
/// apart in the unit sphere with overwhelming probability.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self {
            dimensions: EMBEDDING_DIMENSIONS,
        }
    }

    /// Overrides the vector width, for tests that want small vectors.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish() | 1;

        let mut vector: Vec<f32> = (0..self.dimensions)
            .map(|_| {
                // xorshift64 over the text hash keeps this dependency-free
                // and reproducible across runs.
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state as f64 / u64::MAX as f64) as f32 - 0.5
            })
            .collect();

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingResult, RagError> {
        Ok(EmbeddingResult {
            embedding: self.embed_one(text),
            tokens: crate::chunking::estimate_tokens(text) as u64,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<BatchEmbeddingResult, RagError> {
        if texts.len() > MAX_EMBEDDING_BATCH {
            return Err(RagError::Validation(format!(
                "batch size {} exceeds maximum of {MAX_EMBEDDING_BATCH} texts",
                texts.len()
            )));
        }

        let mut result = BatchEmbeddingResult::default();
        for text in texts {
            result.embeddings.push(self.embed_one(text));
            result.total_tokens += crate::chunking::estimate_tokens(text) as u64;
        }
        Ok(result)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_vector_with_itself_is_one() {
        let v = vec![0.3f32, -1.2, 4.5, 0.01];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6, "got {sim}");
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        let v = vec![1.0f32, 2.0, 3.0];
        let zero = vec![0.0f32; 3];
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let a = vec![1.0f32, 0.0];
        let b = vec![0.0f32, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn mismatched_lengths_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn embedding_validation_checks_width_and_finiteness() {
        assert!(is_valid_embedding(&[0.1, 0.2, 0.3], 3));
        assert!(!is_valid_embedding(&[0.1, 0.2], 3));
        assert!(!is_valid_embedding(&[0.1, f32::NAN, 0.3], 3));
        assert!(!is_valid_embedding(&[0.1, f32::INFINITY, 0.3], 3));
    }

    #[test]
    fn cost_estimate_matches_reference_rate() {
        assert_eq!(estimate_embedding_cost(1_000_000), 0.02);
        assert_eq!(estimate_embedding_cost(0), 0.0);
    }

    #[tokio::test]
    async fn mock_provider_is_deterministic() {
        let provider = MockEmbeddingProvider::new().with_dimensions(64);
        let a1 = provider.embed("same text").await.unwrap();
        let a2 = provider.embed("same text").await.unwrap();
        let b = provider.embed("different text").await.unwrap();

        assert_eq!(a1.embedding, a2.embedding);
        assert_ne!(a1.embedding, b.embedding);
        assert_eq!(a1.embedding.len(), 64);

        let norm: f32 = a1.embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3, "mock vectors should be unit length");
    }

    #[tokio::test]
    async fn mock_batch_preserves_order_and_caps_size() {
        let provider = MockEmbeddingProvider::new().with_dimensions(16);
        let texts: Vec<String> = (0..5).map(|i| format!("text {i}")).collect();
        let batch = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.embeddings.len(), 5);
        for (i, text) in texts.iter().enumerate() {
            let single = provider.embed(text).await.unwrap();
            assert_eq!(batch.embeddings[i], single.embedding);
        }

        let too_many: Vec<String> = (0..3000).map(|i| i.to_string()).collect();
        let err = provider.embed_batch(&too_many).await.unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
    }

    #[tokio::test]
    async fn embed_in_batches_walks_the_whole_input() {
        let provider: Arc<dyn EmbeddingProvider> =
            Arc::new(MockEmbeddingProvider::new().with_dimensions(8));
        let texts: Vec<String> = (0..7).map(|i| format!("chunk {i}")).collect();
        let result = embed_in_batches(&provider, &texts, 3).await.unwrap();
        assert_eq!(result.embeddings.len(), 7);

        let err = embed_in_batches(&provider, &texts, 0).await.unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
    }
}
