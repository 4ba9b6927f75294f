//! Error types for the AI search service
//!
//! Every failure in the answer pipeline is one of five kinds:
//! - Configuration: a required credential is absent
//! - Validation: the request is unusable (missing query, malformed body)
//! - Retrieval: a content-store lookup failed
//! - Generation: the provider call failed, timed out or returned garbage
//! - Unknown: anything else
//!
//! All of them reach the caller as a single `{ "error": message }` payload
//! with status 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retrieval::RetrievalMode;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Failure taxonomy used for logging and metrics labels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Validation,
    Retrieval,
    Generation,
    Unknown,
}

impl ErrorKind {
    /// Label used in metrics and structured logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Validation => "validation",
            ErrorKind::Retrieval => "retrieval",
            ErrorKind::Generation => "generation",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Configuration errors
    #[error("{message}")]
    Configuration { message: String },

    // Validation errors
    #[error("{message}")]
    Validation { message: String },

    // Retrieval errors
    #[error("Failed to search database ({mode}): {message}")]
    Retrieval { mode: RetrievalMode, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    // Generation errors
    #[error("{message}")]
    Generation { message: String },

    #[error("Generation timed out after {timeout_ms}ms")]
    GenerationTimeout { timeout_ms: u64 },

    // Internal errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Shorthand for the missing-query rejection
    pub fn missing_query() -> Self {
        AppError::Validation {
            message: "Query is required".to_string(),
        }
    }

    /// Get the failure kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Configuration { .. } => ErrorKind::Configuration,
            AppError::Validation { .. } => ErrorKind::Validation,
            AppError::Retrieval { .. } | AppError::Database(_) => ErrorKind::Retrieval,
            AppError::Generation { .. } | AppError::GenerationTimeout { .. } => {
                ErrorKind::Generation
            }
            AppError::Serialization(_) | AppError::Internal { .. } => ErrorKind::Unknown,
        }
    }

    /// HTTP status for this error.
    ///
    /// Callers only distinguish success from failure, so every kind maps to 500.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Error payload returned to the caller
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();
        let message = self.to_string();

        tracing::error!(
            error = %message,
            kind = kind.as_str(),
            status = status.as_u16(),
            "Error in ai-search"
        );

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(AppError::missing_query().kind(), ErrorKind::Validation);
        assert_eq!(
            AppError::Configuration { message: "OPENAI_API_KEY is not set".into() }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            AppError::GenerationTimeout { timeout_ms: 10 }.kind(),
            ErrorKind::Generation
        );
        assert_eq!(
            AppError::Database(sea_orm::DbErr::Custom("down".into())).kind(),
            ErrorKind::Retrieval
        );
        assert_eq!(
            AppError::Internal { message: "boom".into() }.kind(),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn test_every_kind_is_500() {
        let errors = [
            AppError::missing_query(),
            AppError::Generation { message: "x".into() },
            AppError::Internal { message: "x".into() },
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_message_is_user_facing() {
        let err = AppError::Generation {
            message: "OpenAI API error: invalid model".into(),
        };
        assert_eq!(err.to_string(), "OpenAI API error: invalid model");
        assert_eq!(AppError::missing_query().to_string(), "Query is required");
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = AppError::missing_query().into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, ErrorResponse::new("Query is required"));
    }
}
