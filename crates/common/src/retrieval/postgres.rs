//! Postgres retrieval over the `search_content` table
//!
//! - Full-text: `websearch_to_tsquery` with the english configuration,
//!   ranked by `ts_rank`
//! - Substring: `ILIKE` containment with the query matched literally

use super::{RetrievalMode, Retriever, SearchableRecord};
use crate::db::models::SearchContentEntity;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::{DbBackend, EntityTrait, Statement};

const FULL_TEXT_SQL: &str = r#"
    SELECT id, content_type, title, description, searchable_text, metadata
    FROM search_content
    WHERE to_tsvector('english', searchable_text) @@ websearch_to_tsquery('english', $1)
    ORDER BY ts_rank(
        to_tsvector('english', searchable_text),
        websearch_to_tsquery('english', $1)
    ) DESC
    LIMIT $2
"#;

const SUBSTRING_SQL: &str = r#"
    SELECT id, content_type, title, description, searchable_text, metadata
    FROM search_content
    WHERE searchable_text ILIKE $1 ESCAPE '\'
    LIMIT $2
"#;

/// Ranked full-text retriever
#[derive(Clone)]
pub struct PgFullTextRetriever {
    db: DbPool,
}

impl PgFullTextRetriever {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl Retriever for PgFullTextRetriever {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<SearchableRecord>> {
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            FULL_TEXT_SQL,
            vec![query.to_owned().into(), (limit as i64).into()],
        );

        fetch(&self.db, statement, self.mode()).await
    }

    fn mode(&self) -> RetrievalMode {
        RetrievalMode::FullText
    }
}

/// Case-insensitive substring retriever
#[derive(Clone)]
pub struct PgSubstringRetriever {
    db: DbPool,
}

impl PgSubstringRetriever {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl Retriever for PgSubstringRetriever {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<SearchableRecord>> {
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            SUBSTRING_SQL,
            vec![contains_pattern(query).into(), (limit as i64).into()],
        );

        fetch(&self.db, statement, self.mode()).await
    }

    fn mode(&self) -> RetrievalMode {
        RetrievalMode::Substring
    }
}

async fn fetch(
    db: &DbPool,
    statement: Statement,
    mode: RetrievalMode,
) -> Result<Vec<SearchableRecord>> {
    let rows = SearchContentEntity::find()
        .from_raw_sql(statement)
        .all(db.read())
        .await
        .map_err(|e| AppError::Retrieval {
            mode,
            message: e.to_string(),
        })?;

    Ok(rows.into_iter().map(SearchableRecord::from).collect())
}

/// Build an ILIKE pattern that matches `query` literally anywhere in the text
fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_wraps_query() {
        assert_eq!(contains_pattern("onion price"), "%onion price%");
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_queries_bind_limit() {
        assert!(FULL_TEXT_SQL.contains("websearch_to_tsquery('english', $1)"));
        assert!(FULL_TEXT_SQL.contains("LIMIT $2"));
        assert!(SUBSTRING_SQL.contains("ILIKE $1"));
    }
}
