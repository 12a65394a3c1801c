//! Environment-driven configuration for the hosted model clients.

use std::env;

use crate::types::RagError;

/// Default public API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Embedding model the corpus dimensionality (1536) is pinned to.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Chat model used for summaries and document chat.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Connection settings shared by the embedding and completion clients.
///
/// Built explicitly (or via [`OpenAiConfig::from_env`]) and handed to the
/// provider constructors; nothing in the core reads the environment on its
/// own.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
}

impl OpenAiConfig {
    /// Creates a config with default endpoint and model names.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }

    /// Overrides the API base URL. Trailing slashes are trimmed so request
    /// paths can always be joined with a single `/`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    #[must_use]
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Loads configuration from the environment (`.env` honored via dotenvy).
    ///
    /// `OPENAI_API_KEY` is required; `OPENAI_BASE_URL`,
    /// `OPENAI_EMBEDDING_MODEL`, and `OPENAI_CHAT_MODEL` override defaults.
    pub fn from_env() -> Result<Self, RagError> {
        dotenvy::dotenv().ok();

        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| RagError::Config("OPENAI_API_KEY is not set".into()))?;
        if api_key.trim().is_empty() {
            return Err(RagError::Config("OPENAI_API_KEY is empty".into()));
        }

        let mut config = Self::new(api_key);
        if let Ok(base_url) = env::var("OPENAI_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Ok(model) = env::var("OPENAI_EMBEDDING_MODEL") {
            config = config.with_embedding_model(model);
        }
        if let Ok(model) = env::var("OPENAI_CHAT_MODEL") {
            config = config.with_chat_model(model);
        }
        Ok(config)
    }
}
