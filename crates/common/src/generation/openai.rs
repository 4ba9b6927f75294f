//! OpenAI-compatible chat completion client

use super::{AnswerGenerator, ChatMessage, GenerationRequest};
use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Chat completion client
pub struct OpenAiChatGenerator {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

/// Provider response, decoded as either a completion or an error object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletion {
    Failure { error: ProviderError },
    Success { choices: Vec<ChatChoice> },
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatCompletion {
    /// Collapse the wire variant into the completion text or a generation error
    fn into_text(self) -> Result<String> {
        match self {
            ChatCompletion::Failure { error } => Err(provider_error(error)),
            ChatCompletion::Success { choices } => choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .filter(|content| !content.trim().is_empty())
                .ok_or_else(|| AppError::Generation {
                    message: "Empty response from OpenAI".to_string(),
                }),
        }
    }
}

fn provider_error(error: ProviderError) -> AppError {
    AppError::Generation {
        message: format!(
            "OpenAI API error: {}",
            error.message.unwrap_or_else(|| "Unknown error".to_string())
        ),
    }
}

impl OpenAiChatGenerator {
    /// Create a new client from configuration.
    ///
    /// A missing key is accepted here and reported per request, before any
    /// network call.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            timeout,
        })
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| AppError::Configuration {
            message: "OPENAI_API_KEY is not set".to_string(),
        })
    }

    async fn call(&self, request: &GenerationRequest) -> Result<String> {
        let api_key = self.api_key()?;

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.params.temperature,
            max_tokens: request.params.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let raw = response.text().await.map_err(|e| self.transport_error(e))?;
        let parsed = serde_json::from_str::<ChatCompletion>(&raw);

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "OpenAI API returned an error status");
            return Err(match parsed {
                Ok(ChatCompletion::Failure { error }) => provider_error(error),
                _ => provider_error(ProviderError { message: None }),
            });
        }

        parsed
            .map_err(|e| AppError::Generation {
                message: format!("Failed to parse OpenAI response: {}", e),
            })?
            .into_text()
    }

    fn transport_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::GenerationTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            AppError::Generation {
                message: format!("OpenAI API request failed: {}", err),
            }
        }
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiChatGenerator {
    fn check_credentials(&self) -> Result<()> {
        self.api_key().map(|_| ())
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let start = Instant::now();
        let result = self.call(request).await;

        metrics::record_generation(start.elapsed().as_secs_f64(), &self.model, result.is_ok());

        if let Err(ref e) = result {
            tracing::error!(model = %self.model, error = %e, "Generation failed");
        }

        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
