//! Chat-completion client: request/response types and the provider trait.

mod openai;

use async_trait::async_trait;

use crate::message::Message;
use crate::types::RagError;

pub use openai::OpenAiCompletionProvider;

/// Default completion budget for summaries.
pub const DEFAULT_MAX_TOKENS: u32 = 1500;
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// One chat-completion call: ordered messages plus sampling parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    /// Overrides the configured model when set.
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            model: None,
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Model output plus usage metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionResponse {
    pub content: String,
    pub tokens_used: u64,
    pub model: String,
}

/// Produces a single completion for an ordered message sequence.
///
/// Injected into the orchestrators as `Arc<dyn CompletionProvider>`; no
/// retries happen inside the core.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, RagError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_applies_overrides() {
        let request = CompletionRequest::new(vec![Message::user("hi")])
            .with_model("gpt-4o")
            .with_max_tokens(500)
            .with_temperature(0.2);
        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert_eq!(request.max_tokens, 500);
        assert_eq!(request.temperature, 0.2);
    }

    #[test]
    fn request_defaults_match_reference_client() {
        let request = CompletionRequest::new(vec![]);
        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(request.temperature, DEFAULT_TEMPERATURE);
        assert!(request.model.is_none());
    }
}
