//! Sentence-aligned, overlapping text chunking for embedding and retrieval.
//!
//! Raw extracted text is normalized, split into sentence-like units, then
//! greedily packed into chunks sized by the shared token estimate. Closing a
//! chunk carries its trailing sentences forward as overlap so retrieval
//! context survives chunk boundaries.

mod normalize;
mod sentences;

use serde::{Deserialize, Serialize};

pub use normalize::{normalize_text, truncate_text};
pub use sentences::split_sentences;

/// Default chunk size in estimated tokens.
pub const DEFAULT_TARGET_TOKENS: usize = 1000;
/// Default overlap carried between consecutive chunks, in estimated tokens.
pub const DEFAULT_OVERLAP_TOKENS: usize = 200;

/// A contiguous slice of a document, sized for embedding.
///
/// Immutable once produced; `chunk_index` is contiguous from 0 across the
/// document's chunk sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub content: String,
    pub chunk_index: usize,
    pub token_count: usize,
    pub page_number: Option<u32>,
}

/// Per-page extractor output, for PDFs whose collaborator preserves page
/// boundaries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub text: String,
    pub page_number: u32,
}

/// Aggregate statistics over a chunk sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub avg_tokens_per_chunk: usize,
    pub min_tokens: usize,
    pub max_tokens: usize,
    pub total_tokens: usize,
}

/// Estimates token count as `ceil(chars / 4)`.
///
/// This is the single heuristic used everywhere tokens are estimated —
/// chunk packing, context budgeting, and cost estimation must agree.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Splits `text` into overlapping, sentence-aligned chunks.
///
/// Sentences accumulate greedily until the next one would push the estimate
/// past `target_tokens`; the chunk is then closed and its trailing sentences
/// (up to `overlap_tokens`) seed the successor. The final partial chunk is
/// emitted even when small. Empty or whitespace-only input yields an empty
/// sequence.
pub fn chunk_text(text: &str, target_tokens: usize, overlap_tokens: usize) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    if text.trim().is_empty() {
        return chunks;
    }

    let cleaned = normalize_text(text);
    let sentences = split_sentences(&cleaned);

    let mut current: Vec<String> = Vec::new();
    let mut current_tokens = 0usize;
    let mut chunk_index = 0usize;

    for sentence in sentences {
        let sentence_tokens = estimate_tokens(&sentence);

        if current_tokens + sentence_tokens > target_tokens && !current.is_empty() {
            let content = current.join(" ");
            chunks.push(TextChunk {
                token_count: estimate_tokens(&content),
                content,
                chunk_index,
                page_number: None,
            });
            chunk_index += 1;

            // Walk backward through the closed chunk, keeping trailing
            // sentences while the overlap budget holds. Zero kept sentences
            // means the next chunk starts fresh.
            let mut overlap: Vec<String> = Vec::new();
            let mut kept_tokens = 0usize;
            for prev in current.iter().rev() {
                let tokens = estimate_tokens(prev);
                if kept_tokens + tokens > overlap_tokens {
                    break;
                }
                overlap.push(prev.clone());
                kept_tokens += tokens;
            }
            overlap.reverse();

            current = overlap;
            current_tokens = kept_tokens;
        }

        current_tokens += sentence_tokens;
        current.push(sentence);
    }

    if !current.is_empty() {
        let content = current.join(" ");
        chunks.push(TextChunk {
            token_count: estimate_tokens(&content),
            content,
            chunk_index,
            page_number: None,
        });
    }

    chunks
}

/// Chunks per-page text, stamping page numbers and re-indexing so
/// `chunk_index` stays contiguous across the whole document.
pub fn chunk_pages(
    pages: &[PageText],
    target_tokens: usize,
    overlap_tokens: usize,
) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let mut chunk_index = 0usize;

    for page in pages {
        for chunk in chunk_text(&page.text, target_tokens, overlap_tokens) {
            chunks.push(TextChunk {
                chunk_index,
                page_number: Some(page.page_number),
                ..chunk
            });
            chunk_index += 1;
        }
    }

    chunks
}

/// Quality gate applied before persistence.
///
/// A chunk is usable iff it has at least 50 characters, at least 10 words,
/// and at least 30 characters left after stripping everything but ASCII
/// word characters.
pub fn is_valid_chunk(chunk: &TextChunk) -> bool {
    if chunk.content.chars().count() < 50 {
        return false;
    }
    if chunk.content.split_whitespace().count() < 10 {
        return false;
    }
    let meaningful = chunk
        .content
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .count();
    meaningful >= 30
}

/// Summarizes a chunk sequence for logging and ingestion reports.
pub fn chunking_stats(chunks: &[TextChunk]) -> ChunkingStats {
    if chunks.is_empty() {
        return ChunkingStats::default();
    }

    let total_tokens: usize = chunks.iter().map(|c| c.token_count).sum();
    let min_tokens = chunks.iter().map(|c| c.token_count).min().unwrap_or(0);
    let max_tokens = chunks.iter().map(|c| c.token_count).max().unwrap_or(0);

    ChunkingStats {
        total_chunks: chunks.len(),
        avg_tokens_per_chunk: (total_tokens as f64 / chunks.len() as f64).round() as usize,
        min_tokens,
        max_tokens,
        total_tokens,
    }
}
