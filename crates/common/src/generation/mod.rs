//! Answer generation
//!
//! Provides a unified interface over text-completion providers:
//! - OpenAI-compatible chat completions
//! - Echo (offline, deterministic; for local development)

mod echo;
mod openai;

pub use echo::EchoGenerator;
pub use openai::OpenAiChatGenerator;

use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Message role in a chat exchange
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Sampling operating point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

impl From<&GenerationConfig> for GenerationParams {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// A single completion request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub params: GenerationParams,
}

impl GenerationRequest {
    /// Grounding instruction as the system message, raw query as the user message
    pub fn grounded(instruction: &str, query: &str, params: GenerationParams) -> Self {
        Self {
            messages: vec![ChatMessage::system(instruction), ChatMessage::user(query)],
            params,
        }
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.message(ChatRole::System)
    }

    pub fn user_prompt(&self) -> Option<&str> {
        self.message(ChatRole::User)
    }

    fn message(&self, role: ChatRole) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
    }
}

/// Trait for answer generation
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Fail fast when the provider cannot be called at all
    fn check_credentials(&self) -> Result<()> {
        Ok(())
    }

    /// Produce the completion text. One attempt, no retry.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create a generator based on configuration
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn AnswerGenerator>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiChatGenerator::new(config)?)),
        "echo" => {
            tracing::warn!("Using echo generator; answers are not model generated");
            Ok(Arc::new(EchoGenerator::new()))
        }
        other => Err(AppError::Configuration {
            message: format!("Unknown generation provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grounded_request_shape() {
        let request = GenerationRequest::grounded("ctx", "onion price", GenerationParams::default());

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, ChatRole::System);
        assert_eq!(request.system_prompt(), Some("ctx"));
        assert_eq!(request.user_prompt(), Some("onion price"));
        assert_eq!(request.params.max_tokens, 500);
    }

    #[test]
    fn test_role_wire_names() {
        let json = serde_json::to_value(ChatMessage::system("x")).unwrap();
        assert_eq!(json["role"], "system");
    }

    #[test]
    fn test_create_generator_by_provider() {
        let mut config = GenerationConfig::default();

        config.provider = "echo".to_string();
        assert_eq!(create_generator(&config).unwrap().model_name(), "echo");

        config.provider = "openai".to_string();
        assert_eq!(create_generator(&config).unwrap().model_name(), "gpt-4o-mini");

        config.provider = "nope".to_string();
        assert!(matches!(
            create_generator(&config),
            Err(AppError::Configuration { .. })
        ));
    }
}
