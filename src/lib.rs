//! Retrieval-augmented summarization and chat core for PDF documents.
//!
//! ```text
//! Extracted text ──► chunking ──► embeddings ──► stores (chunk + vector)
//!                                     │
//! User question ──► embeddings ───────┤
//!                                     ▼
//!                 retrieval ──► context ──► chat / summarize ──► completion
//!                                                │
//!                                                └─► answer + source citations
//! ```
//!
//! The crate owns the pipeline above and nothing else. Authentication,
//! uploads, routing, rate-limit policy, and PDF-to-text extraction live with
//! the caller; the core sees raw extracted text, opaque document ids, and
//! explicitly injected provider clients.

pub mod chat;
pub mod chunking;
pub mod completion;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod ingestion;
pub mod message;
pub mod prompts;
pub mod retrieval;
pub mod stores;
pub mod summarize;
pub mod types;

pub use chat::{ChatConfig, ChatEngine, ChatOutcome};
pub use chunking::{PageText, TextChunk, chunk_pages, chunk_text, is_valid_chunk};
pub use completion::{CompletionProvider, CompletionRequest, CompletionResponse};
pub use config::OpenAiConfig;
pub use context::build_context;
pub use embeddings::{EmbeddingProvider, cosine_similarity};
pub use ingestion::{IngestionConfig, IngestionOutcome, IngestionPipeline};
pub use message::Message;
pub use prompts::Audience;
pub use retrieval::{RetrievalOptions, RetrievedChunk, Retriever, SourceCitation};
pub use stores::{ChunkStore, StoredChunk};
pub use summarize::{Summarizer, SummaryOptions, SummaryOutcome};
pub use types::{RagError, ServiceErrorKind};
