//! Sabzi Saathi Common Library
//!
//! Shared code for the marketplace AI search service including:
//! - Content store access (full-text and substring retrieval)
//! - Result merging and grounding context assembly
//! - Answer generation client abstraction
//! - The answer pipeline service
//! - Error types, configuration, metrics

pub mod answer;
pub mod config;
pub mod context;
pub mod db;
pub mod errors;
pub mod generation;
pub mod metrics;
pub mod retrieval;

// Re-export commonly used types
pub use answer::{AiSearchRequest, AiSearchResponse, AiSearchService};
pub use config::AppConfig;
pub use errors::{AppError, ErrorResponse, Result};
pub use generation::AnswerGenerator;
pub use retrieval::{ContentStoreAccessor, Retriever, SearchableRecord};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
