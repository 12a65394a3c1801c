//! OpenAI-compatible chat-completion client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CompletionProvider, CompletionRequest, CompletionResponse};
use crate::config::OpenAiConfig;
use crate::message::Message;
use crate::types::{RagError, ServiceErrorKind};

#[derive(Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
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

/// Completion client for the hosted `/chat/completions` endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiCompletionProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiCompletionProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| RagError::Config(err.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, RagError> {
        let model = request
            .model
            .as_deref()
            .unwrap_or(&self.config.chat_model)
            .to_string();
        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&ChatCompletionsRequest {
                model: &model,
                messages: &request.messages,
                max_tokens: request.max_tokens,
                temperature: request.temperature,
            })
            .send()
            .await
            .map_err(|err| RagError::Completion {
                kind: ServiceErrorKind::Other,
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| format!("completion request failed with status {status}"));
            return Err(RagError::Completion {
                kind: ServiceErrorKind::classify(status.as_u16(), &message),
                message,
            });
        }

        let body: ChatCompletionsResponse =
            response.json().await.map_err(|err| RagError::Completion {
                kind: ServiceErrorKind::Other,
                message: format!("malformed completion response: {err}"),
            })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(RagError::Completion {
                kind: ServiceErrorKind::Other,
                message: "no content returned by the model".into(),
            });
        }

        Ok(CompletionResponse {
            content,
            tokens_used: body.usage.map_or(0, |u| u.total_tokens),
            model,
        })
    }
}
