//! Per-turn document chat: retrieve, assemble, complete, cite.

use std::sync::Arc;

use tracing::debug;

use crate::completion::{CompletionProvider, CompletionRequest};
use crate::context::{DEFAULT_CONTEXT_TOKENS, build_context};
use crate::message::Message;
use crate::prompts::{Audience, build_chat_system_prompt};
use crate::retrieval::{RetrievalOptions, RetrievedChunk, Retriever, SourceCitation};
use crate::types::RagError;

/// Upper bound on a single user message.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Turn parameters. The low default threshold trades precision for recall
/// on short questions.
#[derive(Clone, Copy, Debug)]
pub struct ChatConfig {
    pub threshold: f32,
    pub count: usize,
    pub context_tokens: usize,
    pub history_turns: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            count: 5,
            context_tokens: DEFAULT_CONTEXT_TOKENS,
            history_turns: 10,
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

/// One answered turn: the reply plus the citations for exactly the chunks
/// used this turn.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatOutcome {
    pub answer: String,
    pub tokens_used: u64,
    pub sources: Vec<SourceCitation>,
}

/// Chat orchestrator over a single document.
pub struct ChatEngine {
    retriever: Retriever,
    provider: Arc<dyn CompletionProvider>,
    config: ChatConfig,
}

impl ChatEngine {
    pub fn new(retriever: Retriever, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            retriever,
            provider,
            config: ChatConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ChatConfig) -> Self {
        self.config = config;
        self
    }

    /// Answers `message` about `document_id` for the given audience.
    ///
    /// Retrieval runs on the new message only, never the whole
    /// conversation. `history` is the prior turns oldest-to-newest and must
    /// not include the current message; only the last
    /// [`ChatConfig::history_turns`] entries are forwarded to the model.
    ///
    /// Zero retrieved chunks short-circuits before any completion call:
    /// [`RagError::DocumentNotIngested`] when the document has no chunks at
    /// all, [`RagError::NoRelevantChunks`] when chunks exist but none
    /// cleared the threshold.
    pub async fn respond(
        &self,
        document_id: &str,
        audience: Audience,
        history: &[Message],
        message: &str,
    ) -> Result<ChatOutcome, RagError> {
        let length = message.chars().count();
        if length == 0 {
            return Err(RagError::Validation("message must not be empty".into()));
        }
        if length > MAX_MESSAGE_CHARS {
            return Err(RagError::Validation(format!(
                "message length {length} exceeds maximum of {MAX_MESSAGE_CHARS} characters"
            )));
        }

        let chunks = self
            .retriever
            .retrieve(
                message,
                document_id,
                RetrievalOptions {
                    threshold: self.config.threshold,
                    count: self.config.count,
                },
            )
            .await?;

        if chunks.is_empty() {
            let total = self.retriever.store().count_chunks(document_id).await?;
            return Err(if total == 0 {
                RagError::DocumentNotIngested
            } else {
                RagError::NoRelevantChunks
            });
        }

        let context = build_context(&chunks, self.config.context_tokens);
        let system_prompt = build_chat_system_prompt(audience, &context);

        let mut messages = Vec::with_capacity(self.config.history_turns + 2);
        messages.push(Message::system(system_prompt));
        let window_start = history.len().saturating_sub(self.config.history_turns);
        messages.extend(history[window_start..].iter().cloned());
        messages.push(Message::user(message));

        debug!(
            document_id,
            history_len = history.len(),
            forwarded = messages.len() - 2,
            chunks = chunks.len(),
            "answering chat turn"
        );

        let response = self
            .provider
            .complete(
                CompletionRequest::new(messages)
                    .with_max_tokens(self.config.max_tokens)
                    .with_temperature(self.config.temperature),
            )
            .await?;

        Ok(ChatOutcome {
            answer: response.content,
            tokens_used: response.tokens_used,
            sources: chunks.iter().map(RetrievedChunk::citation).collect(),
        })
    }
}
