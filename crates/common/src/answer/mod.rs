//! AI search answer pipeline
//!
//! One stateless pass per request:
//! RECEIVED → VALIDATED → RETRIEVED → MERGED → CONTEXTUALIZED → ANSWERED → RESPONDED.
//! Any failure ends the pass; no partial output is ever returned.

use crate::config::AppConfig;
use crate::context::{ContextBuilder, ContextBuilderConfig, ContextEntry, UserType};
use crate::errors::{AppError, Result};
use crate::generation::{AnswerGenerator, GenerationParams, GenerationRequest};
use crate::metrics;
use crate::retrieval::{merge_candidates, ContentStoreAccessor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use validator::{Validate, ValidationError};

/// Longest accepted query, counted after trimming
pub const MAX_QUERY_CHARS: usize = 1000;

/// Incoming request body
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AiSearchRequest {
    #[serde(default)]
    #[validate(custom(function = "query_within_limit"))]
    pub query: Option<String>,

    /// "vendor" or "hub"; anything else, non-strings included, gets hub framing
    #[serde(default, deserialize_with = "lenient_label")]
    pub user_type: Option<String>,
}

fn query_within_limit(query: &str) -> std::result::Result<(), ValidationError> {
    if query.trim().chars().count() > MAX_QUERY_CHARS {
        return Err(ValidationError::new("length")
            .with_message("Query must be at most 1000 characters".into()));
    }
    Ok(())
}

/// Decode a label leniently: only JSON strings are kept
fn lenient_label<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(label)) => Some(label),
        _ => None,
    })
}

impl AiSearchRequest {
    pub fn new(query: impl Into<String>, user_type: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            user_type: Some(user_type.into()),
        }
    }

    /// Parse a raw JSON body
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| AppError::Validation {
            message: format!("Invalid request body: {}", e),
        })
    }

    /// The query, if present and not blank
    fn validated_query(&self) -> Result<&str> {
        let query = self
            .query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(AppError::missing_query)?;

        self.validate().map_err(|e| AppError::Validation {
            message: e.to_string(),
        })?;

        Ok(query)
    }
}

/// Successful answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSearchResponse {
    /// Generated answer text
    pub response: String,

    /// Context entries the answer was grounded on; null when there were none
    pub sources: Option<Vec<ContextEntry>>,

    /// Echo of the input query
    pub query: String,
}

/// Last stage a request completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Received,
    Validated,
    Retrieved,
    Merged,
    Contextualized,
    Answered,
    Responded,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Validated => "validated",
            PipelineStage::Retrieved => "retrieved",
            PipelineStage::Merged => "merged",
            PipelineStage::Contextualized => "contextualized",
            PipelineStage::Answered => "answered",
            PipelineStage::Responded => "responded",
        };
        f.write_str(name)
    }
}

/// Orchestrates retrieval, merging, context building and generation
#[derive(Clone)]
pub struct AiSearchService {
    accessor: ContentStoreAccessor,
    context: ContextBuilder,
    generator: Arc<dyn AnswerGenerator>,
    params: GenerationParams,
    generation_timeout: Duration,
}

impl AiSearchService {
    pub fn new(
        accessor: ContentStoreAccessor,
        generator: Arc<dyn AnswerGenerator>,
        config: &AppConfig,
    ) -> Self {
        Self {
            accessor,
            context: ContextBuilder::new(ContextBuilderConfig::from(&config.retrieval)),
            generator,
            params: GenerationParams::from(&config.generation),
            generation_timeout: config.generation_timeout(),
        }
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Whether the generation provider can be called at all
    pub fn check_credentials(&self) -> Result<()> {
        self.generator.check_credentials()
    }

    /// Answer a raw JSON request body
    pub async fn answer_raw(&self, body: &[u8]) -> Result<AiSearchResponse> {
        self.execute(|| AiSearchRequest::from_slice(body)).await
    }

    /// Answer an already-decoded request
    pub async fn answer(&self, request: AiSearchRequest) -> Result<AiSearchResponse> {
        self.execute(move || Ok(request)).await
    }

    async fn execute<F>(&self, read: F) -> Result<AiSearchResponse>
    where
        F: FnOnce() -> Result<AiSearchRequest>,
    {
        let start = Instant::now();
        let mut stage = PipelineStage::Received;

        let result = self.run(read, &mut stage).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    query = %response.query,
                    sources = response.sources.as_ref().map_or(0, Vec::len),
                    latency_ms = elapsed.as_millis() as u64,
                    "AI search completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    failed_after = %stage,
                    kind = e.kind().as_str(),
                    error = %e,
                    latency_ms = elapsed.as_millis() as u64,
                    "AI search failed"
                );
            }
        }

        metrics::record_ai_search(
            elapsed.as_secs_f64(),
            result.as_ref().err().map(AppError::kind),
        );

        result
    }

    async fn run<F>(&self, read: F, stage: &mut PipelineStage) -> Result<AiSearchResponse>
    where
        F: FnOnce() -> Result<AiSearchRequest>,
    {
        // Credentials are checked before the body is even looked at
        self.generator.check_credentials()?;

        let request = read()?;
        let query = request.validated_query()?;
        let user_type = UserType::from_label(request.user_type.as_deref());
        *stage = PipelineStage::Validated;

        let lookups = self.accessor.lookup(query).await?;
        *stage = PipelineStage::Retrieved;

        let (primary, secondary) = (lookups.primary.len(), lookups.secondary.len());
        let merged = merge_candidates(lookups.primary, lookups.secondary);
        metrics::record_candidates(primary, secondary, merged.len());
        *stage = PipelineStage::Merged;

        let grounding = self.context.build(&merged, user_type)?;
        *stage = PipelineStage::Contextualized;

        let generation = GenerationRequest::grounded(&grounding.instruction, query, self.params);
        let response = tokio::time::timeout(
            self.generation_timeout,
            self.generator.generate(&generation),
        )
        .await
        .map_err(|_| AppError::GenerationTimeout {
            timeout_ms: self.generation_timeout.as_millis() as u64,
        })??;
        *stage = PipelineStage::Answered;

        let sources = if grounding.entries.is_empty() {
            None
        } else {
            Some(grounding.entries)
        };
        *stage = PipelineStage::Responded;

        Ok(AiSearchResponse {
            response,
            sources,
            query: query.to_string(),
        })
    }
}
