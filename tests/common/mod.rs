//! Shared fixtures for integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use papertalk::completion::{CompletionProvider, CompletionRequest, CompletionResponse};
use papertalk::types::RagError;

/// Completion provider that replays a canned answer and records what it was
/// asked, so orchestrator tests can count calls and inspect prompts.
pub struct ScriptedCompletion {
    reply: String,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, RagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock() = Some(request);
        Ok(CompletionResponse {
            content: self.reply.clone(),
            tokens_used: 42,
            model: "scripted".into(),
        })
    }
}

/// Opt-in tracing output for debugging test runs (`RUST_LOG=debug`).
#[allow(dead_code)]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// A paragraph that passes the chunk validity gate and fits in one chunk.
pub fn sample_passage() -> String {
    "Transformer models process sequences with self-attention instead of recurrence. \
     Attention weights let every token consult every other token in a single step. \
     This property makes training highly parallel and shortens gradient paths."
        .to_string()
}
