//! OpenAI-compatible embedding client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    BatchEmbeddingResult, EMBEDDING_DIMENSIONS, EmbeddingProvider, EmbeddingResult,
    MAX_EMBEDDING_BATCH,
};
use crate::config::OpenAiConfig;
use crate::types::{RagError, ServiceErrorKind};

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: EmbeddingInput<'a>,
    encoding_format: &'a str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EmbeddingInput<'a> {
    Single(&'a str),
    Batch(&'a [String]),
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u64,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Embedding client for the hosted `/embeddings` endpoint.
///
/// Construct one per configuration and share it behind an
/// `Arc<dyn EmbeddingProvider>`; the orchestration layers never reach for a
/// global client.
#[derive(Clone, Debug)]
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
    dimensions: usize,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| RagError::Config(err.to_string()))?;
        Ok(Self {
            client,
            config,
            dimensions: EMBEDDING_DIMENSIONS,
        })
    }

    /// Overrides the expected vector width when a non-default embedding
    /// model is configured.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    async fn request(&self, input: EmbeddingInput<'_>) -> Result<EmbeddingsResponse, RagError> {
        let url = format!("{}/embeddings", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&EmbeddingsRequest {
                model: &self.config.embedding_model,
                input,
                encoding_format: "float",
            })
            .send()
            .await
            .map_err(|err| RagError::EmbeddingService {
                kind: ServiceErrorKind::Other,
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| format!("embedding request failed with status {status}"));
            return Err(RagError::EmbeddingService {
                kind: ServiceErrorKind::classify(status.as_u16(), &message),
                message,
            });
        }

        response
            .json::<EmbeddingsResponse>()
            .await
            .map_err(|err| RagError::EmbeddingService {
                kind: ServiceErrorKind::Other,
                message: format!("malformed embedding response: {err}"),
            })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingResult, RagError> {
        let body = self.request(EmbeddingInput::Single(text)).await?;
        let tokens = body.usage.map_or(0, |u| u.total_tokens);
        let datum = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| RagError::EmbeddingService {
                kind: ServiceErrorKind::Other,
                message: "no embedding data returned".into(),
            })?;
        Ok(EmbeddingResult {
            embedding: datum.embedding,
            tokens,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<BatchEmbeddingResult, RagError> {
        if texts.is_empty() {
            return Ok(BatchEmbeddingResult::default());
        }
        if texts.len() > MAX_EMBEDDING_BATCH {
            return Err(RagError::Validation(format!(
                "batch size {} exceeds maximum of {MAX_EMBEDDING_BATCH} texts",
                texts.len()
            )));
        }

        let body = self.request(EmbeddingInput::Batch(texts)).await?;
        if body.data.len() != texts.len() {
            return Err(RagError::EmbeddingService {
                kind: ServiceErrorKind::Other,
                message: format!(
                    "provider returned {} embeddings for {} inputs",
                    body.data.len(),
                    texts.len()
                ),
            });
        }

        let total_tokens = body.usage.map_or(0, |u| u.total_tokens);
        Ok(BatchEmbeddingResult {
            // The provider returns embeddings in input order; rely on it the
            // same way the rest of the pipeline does.
            embeddings: body.data.into_iter().map(|d| d.embedding).collect(),
            total_tokens,
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
