//! Audience-tailored document summarization with per-document caching.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::completion::{
    CompletionProvider, CompletionRequest, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use crate::chunking::{normalize_text, truncate_text};
use crate::message::Message;
use crate::prompts::{Audience, SUMMARY_SYSTEM_PROMPT, build_summary_prompt};
use crate::types::RagError;

/// Character budget for summary input, roughly 3000 estimated tokens.
pub const SUMMARY_INPUT_CHAR_BUDGET: usize = 12_000;

/// Below this many characters the extractor output is considered unusable.
pub const MIN_SUMMARY_INPUT_CHARS: usize = 100;

/// Per-call overrides; defaults match the reference client.
#[derive(Clone, Debug)]
pub struct SummaryOptions {
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// A produced (or cache-served) summary.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryOutcome {
    pub summary: String,
    pub tokens_used: u64,
    pub model: String,
    /// True when the result came from the `(document_id, audience)` cache
    /// and no model call was made.
    pub cached: bool,
}

#[derive(Clone)]
struct CachedSummary {
    summary: String,
    tokens_used: u64,
    model: String,
}

/// Summary orchestrator.
///
/// Summaries are cached by `(document_id, audience)` — the cache key is the
/// pair, not the input text — so a repeat request is an idempotent no-op
/// that performs zero completion calls.
pub struct Summarizer {
    provider: Arc<dyn CompletionProvider>,
    cache: RwLock<HashMap<(String, Audience), CachedSummary>>,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Summarizes `text` for `audience`.
    ///
    /// The text is normalized and truncated to
    /// [`SUMMARY_INPUT_CHAR_BUDGET`] characters before prompting; inputs
    /// shorter than [`MIN_SUMMARY_INPUT_CHARS`] after cleanup fail with
    /// [`RagError::NoUsableContent`].
    pub async fn summarize(
        &self,
        document_id: &str,
        text: &str,
        audience: Audience,
        options: &SummaryOptions,
    ) -> Result<SummaryOutcome, RagError> {
        let key = (document_id.to_string(), audience);

        if let Some(hit) = self.cache.read().get(&key).cloned() {
            debug!(document_id, audience = %audience, "summary cache hit");
            return Ok(SummaryOutcome {
                summary: hit.summary,
                tokens_used: hit.tokens_used,
                model: hit.model,
                cached: true,
            });
        }

        let cleaned = normalize_text(text);
        let truncated = truncate_text(&cleaned, SUMMARY_INPUT_CHAR_BUDGET);
        if truncated.chars().count() < MIN_SUMMARY_INPUT_CHARS {
            return Err(RagError::NoUsableContent);
        }

        let prompt = build_summary_prompt(&truncated, audience);
        let mut request = CompletionRequest::new(vec![
            Message::system(SUMMARY_SYSTEM_PROMPT),
            Message::user(prompt),
        ])
        .with_max_tokens(options.max_tokens)
        .with_temperature(options.temperature);
        if let Some(model) = &options.model {
            request = request.with_model(model.clone());
        }

        let response = self.provider.complete(request).await?;
        info!(
            document_id,
            audience = %audience,
            tokens_used = response.tokens_used,
            "summary generated"
        );

        self.cache.write().insert(
            key,
            CachedSummary {
                summary: response.content.clone(),
                tokens_used: response.tokens_used,
                model: response.model.clone(),
            },
        );

        Ok(SummaryOutcome {
            summary: response.content,
            tokens_used: response.tokens_used,
            model: response.model,
            cached: false,
        })
    }

    /// Drops every cached summary for a document. Called when the owning
    /// document is deleted.
    pub fn invalidate_document(&self, document_id: &str) {
        self.cache
            .write()
            .retain(|(cached_document, _), _| cached_document != document_id);
    }
}
