//! Crate-wide error taxonomy.

use thiserror::Error;

/// Category attached to hosted-API failures so callers can decide between
/// retrying, backing off, or surfacing the problem to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// Missing or rejected credentials.
    Auth,
    /// The provider refused the request for throughput reasons.
    RateLimit,
    /// The input exceeded the model's context window.
    ContextLength,
    /// Anything else: network failures, malformed responses, 5xx.
    Other,
}

impl ServiceErrorKind {
    /// Buckets a hosted-API failure by HTTP status, falling back to message
    /// sniffing for providers that put the detail in the body.
    pub fn classify(status: u16, message: &str) -> Self {
        match status {
            401 | 403 => ServiceErrorKind::Auth,
            429 => ServiceErrorKind::RateLimit,
            _ => {
                let lower = message.to_ascii_lowercase();
                if lower.contains("api key") {
                    ServiceErrorKind::Auth
                } else if lower.contains("rate limit") {
                    ServiceErrorKind::RateLimit
                } else if lower.contains("context length")
                    || lower.contains("context_length")
                    || lower.contains("maximum context")
                    || lower.contains("too long")
                {
                    ServiceErrorKind::ContextLength
                } else {
                    ServiceErrorKind::Other
                }
            }
        }
    }
}

impl std::fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ServiceErrorKind::Auth => "auth",
            ServiceErrorKind::RateLimit => "rate-limit",
            ServiceErrorKind::ContextLength => "context-length",
            ServiceErrorKind::Other => "other",
        };
        f.write_str(label)
    }
}

/// Error surface for the RAG core.
///
/// Empty retrieval results are *not* represented here: a query that matches
/// nothing returns `Ok(vec![])` from the retriever. The two chat-specific
/// variants exist because the chat orchestrator must tell the caller *why*
/// nothing was retrieved before it refuses to call the completion model.
#[derive(Debug, Error)]
pub enum RagError {
    /// Input rejected before any external call was made.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The hosted embedding service call failed.
    #[error("embedding service error ({kind}): {message}")]
    EmbeddingService {
        kind: ServiceErrorKind,
        message: String,
    },

    /// The hosted chat-completion service call failed.
    #[error("completion service error ({kind}): {message}")]
    Completion {
        kind: ServiceErrorKind,
        message: String,
    },

    /// A chunk store operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Environment or configuration problem.
    #[error("configuration error: {0}")]
    Config(String),

    /// Chunking and filtering left nothing worth persisting or summarizing.
    #[error("no usable content could be extracted from the document")]
    NoUsableContent,

    /// Chat asked about a document that has no chunks at all.
    #[error(
        "this document has not been processed for chat yet; ingest it before asking questions"
    )]
    DocumentNotIngested,

    /// The document has chunks, but none cleared the similarity threshold.
    #[error(
        "no relevant content found; try asking about specific topics from the paper or rephrasing the question"
    )]
    NoRelevantChunks,
}

impl RagError {
    /// Service-error category, when this error came from a hosted API.
    pub fn service_kind(&self) -> Option<ServiceErrorKind> {
        match self {
            RagError::EmbeddingService { kind, .. } | RagError::Completion { kind, .. } => {
                Some(*kind)
            }
            _ => None,
        }
    }
}
