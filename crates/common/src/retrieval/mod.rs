//! Content store retrieval
//!
//! Two complementary lookups feed the answer pipeline:
//! - Full-text search (relevance ranked, web-search style query parsing)
//! - Substring search (case-insensitive containment)
//!
//! Both sit behind the [`Retriever`] trait, so storage engines can be
//! swapped without touching merge or context logic.

mod memory;
pub mod merge;
mod postgres;

pub use memory::{MemoryFullTextRetriever, MemoryStore, MemorySubstringRetriever};
pub use merge::merge_candidates;
pub use postgres::{PgFullTextRetriever, PgSubstringRetriever};

use crate::config::RetrievalConfig;
use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A unit of retrievable knowledge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchableRecord {
    /// Stable identifier, used for deduplication
    pub id: Uuid,

    /// Classification tag (product, vendor, hub)
    pub content_type: String,

    pub title: String,

    pub description: Option<String>,

    /// Field indexed for full-text matching
    pub searchable_text: String,

    /// Open mapping of semantic attributes
    pub metadata: Option<serde_json::Value>,
}

/// Retrieval strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Relevance-ranked full-text search
    FullText,
    /// Case-insensitive substring containment
    Substring,
}

impl RetrievalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::FullText => "full_text",
            RetrievalMode::Substring => "substring",
        }
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common trait for all retrievers
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve at most `limit` records matching the query, best first
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<SearchableRecord>>;

    /// Get the retrieval mode
    fn mode(&self) -> RetrievalMode;
}

/// Output of the two lookups, in the order each strategy returned them
#[derive(Debug, Clone, Default)]
pub struct LookupResults {
    pub primary: Vec<SearchableRecord>,
    pub secondary: Vec<SearchableRecord>,
}

/// Runs the primary (full-text) and secondary (substring) lookups
#[derive(Clone)]
pub struct ContentStoreAccessor {
    primary: Arc<dyn Retriever>,
    secondary: Arc<dyn Retriever>,
    primary_limit: usize,
    secondary_limit: usize,
}

impl ContentStoreAccessor {
    /// Create an accessor with the default 10 + 5 limits
    pub fn new(primary: Arc<dyn Retriever>, secondary: Arc<dyn Retriever>) -> Self {
        Self::with_config(primary, secondary, &RetrievalConfig::default())
    }

    /// Create an accessor with limits taken from configuration
    pub fn with_config(
        primary: Arc<dyn Retriever>,
        secondary: Arc<dyn Retriever>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            primary,
            secondary,
            primary_limit: config.primary_limit,
            secondary_limit: config.secondary_limit,
        }
    }

    /// Run both lookups concurrently.
    ///
    /// Either one failing fails the whole lookup; partial results are discarded.
    pub async fn lookup(&self, query: &str) -> Result<LookupResults> {
        let (primary, secondary) = tokio::try_join!(
            run_lookup(self.primary.as_ref(), query, self.primary_limit),
            run_lookup(self.secondary.as_ref(), query, self.secondary_limit),
        )?;

        tracing::debug!(
            primary = primary.len(),
            secondary = secondary.len(),
            "Content store lookups completed"
        );

        Ok(LookupResults { primary, secondary })
    }
}

async fn run_lookup(
    retriever: &dyn Retriever,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchableRecord>> {
    let mode = retriever.mode();
    let mut records = retriever.retrieve(query, limit).await.map_err(|e| {
        tracing::error!(mode = %mode, error = %e, "Search error");
        if matches!(e, AppError::Retrieval { .. }) {
            e
        } else {
            AppError::Retrieval {
                mode,
                message: e.to_string(),
            }
        }
    })?;
    records.truncate(limit);
    Ok(records)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub fn record(id: u128, text: &str) -> SearchableRecord {
        SearchableRecord {
            id: Uuid::from_u128(id),
            content_type: "product".to_string(),
            title: format!("Record {}", id),
            description: Some("test".to_string()),
            searchable_text: text.to_string(),
            metadata: None,
        }
    }

    /// Retriever returning a fixed list and counting calls
    pub struct FixedRetriever {
        pub mode: RetrievalMode,
        pub records: Vec<SearchableRecord>,
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    impl FixedRetriever {
        pub fn new(mode: RetrievalMode, records: Vec<SearchableRecord>) -> Self {
            Self {
                mode,
                records,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(mode: RetrievalMode) -> Self {
            Self {
                fail: true,
                ..Self::new(mode, Vec::new())
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Retriever for FixedRetriever {
        async fn retrieve(&self, _query: &str, limit: usize) -> Result<Vec<SearchableRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Internal {
                    message: "store unavailable".to_string(),
                });
            }
            Ok(self.records.iter().take(limit).cloned().collect())
        }

        fn mode(&self) -> RetrievalMode {
            self.mode
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::errors::ErrorKind;

    #[tokio::test]
    async fn test_lookup_returns_both_lists() {
        let primary = Arc::new(FixedRetriever::new(
            RetrievalMode::FullText,
            vec![record(1, "a"), record(2, "b")],
        ));
        let secondary = Arc::new(FixedRetriever::new(
            RetrievalMode::Substring,
            vec![record(2, "b"), record(3, "c")],
        ));

        let accessor = ContentStoreAccessor::new(primary.clone(), secondary.clone());
        let results = accessor.lookup("anything").await.unwrap();

        assert_eq!(results.primary.len(), 2);
        assert_eq!(results.secondary.len(), 2);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_lookup_applies_limits() {
        let many: Vec<_> = (0..20).map(|i| record(i, "x")).collect();
        let primary = Arc::new(FixedRetriever::new(RetrievalMode::FullText, many.clone()));
        let secondary = Arc::new(FixedRetriever::new(RetrievalMode::Substring, many));

        let accessor = ContentStoreAccessor::new(primary, secondary);
        let results = accessor.lookup("x").await.unwrap();

        assert_eq!(results.primary.len(), 10);
        assert_eq!(results.secondary.len(), 5);
    }

    #[tokio::test]
    async fn test_secondary_failure_is_fatal() {
        let primary = Arc::new(FixedRetriever::new(
            RetrievalMode::FullText,
            vec![record(1, "a")],
        ));
        let secondary = Arc::new(FixedRetriever::failing(RetrievalMode::Substring));

        let accessor = ContentStoreAccessor::new(primary, secondary);
        let err = accessor.lookup("a").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Retrieval);
        assert!(matches!(
            err,
            AppError::Retrieval { mode: RetrievalMode::Substring, .. }
        ));
    }

    #[test]
    fn test_record_wire_shape() {
        let json = serde_json::to_value(record(1, "onion")).unwrap();
        assert_eq!(json["contentType"], "product");
        assert_eq!(json["searchableText"], "onion");
    }
}
