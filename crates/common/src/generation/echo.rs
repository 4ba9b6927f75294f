//! Offline generator that answers by echoing the grounding context

use super::{AnswerGenerator, GenerationRequest};
use crate::errors::{AppError, Result};
use async_trait::async_trait;

const CONTEXT_START: &str = "Available data context:\n";
const CONTEXT_END: &str = "\n\nUser type:";

/// Deterministic generator for development and tests
#[derive(Debug, Clone, Default)]
pub struct EchoGenerator;

impl EchoGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnswerGenerator for EchoGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let query = request.user_prompt().ok_or_else(|| AppError::Generation {
            message: "Missing user message".to_string(),
        })?;
        let instruction = request.system_prompt().unwrap_or_default();

        let context = instruction
            .split_once(CONTEXT_START)
            .map(|(_, rest)| rest.split(CONTEXT_END).next().unwrap_or(rest))
            .unwrap_or("[]");

        if context.trim() == "[]" {
            return Ok(format!(
                "I couldn't find information about \"{}\" in the marketplace data.",
                query
            ));
        }

        Ok(format!("Results for \"{}\":\n{}", query, context))
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationParams;

    #[tokio::test]
    async fn test_echoes_context_block() {
        let instruction = "Intro\nAvailable data context:\n[{\"price\": 25}]\n\nUser type: vendor\n";
        let request =
            GenerationRequest::grounded(instruction, "onion price", GenerationParams::default());

        let answer = EchoGenerator::new().generate(&request).await.unwrap();

        assert!(answer.starts_with("Results for \"onion price\""));
        assert!(answer.contains("\"price\": 25"));
        assert!(!answer.contains("User type"));
    }

    #[tokio::test]
    async fn test_reports_empty_context() {
        let instruction = "Available data context:\n[]\n\nUser type: hub";
        let request = GenerationRequest::grounded(instruction, "okra", GenerationParams::default());

        let answer = EchoGenerator::new().generate(&request).await.unwrap();
        assert!(answer.contains("couldn't find"));
    }
}
