//! In-process content store
//!
//! Mirrors the Postgres strategies closely enough for local development and
//! tests: a web-search style full-text matcher with light english
//! normalization, and a case-insensitive substring matcher.

use super::{RetrievalMode, Retriever, SearchableRecord};
use crate::errors::{AppError, Result};
use regex_lite::Regex;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Words the english text-search configuration ignores
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "do", "for", "from", "has", "have", "how",
    "i", "in", "is", "it", "me", "my", "of", "on", "or", "show", "that", "the", "this", "to",
    "what", "which", "with",
];

/// Read-only record set shared by both in-memory retrievers
#[derive(Clone)]
pub struct MemoryStore {
    records: Arc<[SearchableRecord]>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MemoryStore {
    pub fn new(records: Vec<SearchableRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }

    /// Load a JSON array of records
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| AppError::Internal {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let records: Vec<SearchableRecord> = serde_json::from_str(&raw)?;
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn full_text(&self) -> MemoryFullTextRetriever {
        MemoryFullTextRetriever {
            store: self.clone(),
        }
    }

    pub fn substring(&self) -> MemorySubstringRetriever {
        MemorySubstringRetriever {
            store: self.clone(),
        }
    }
}

/// Ranked full-text retriever over a [`MemoryStore`]
#[derive(Clone)]
pub struct MemoryFullTextRetriever {
    store: MemoryStore,
}

#[async_trait::async_trait]
impl Retriever for MemoryFullTextRetriever {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<SearchableRecord>> {
        let parsed = WebQuery::parse(query);
        if parsed.is_empty() {
            return Ok(vec![]);
        }

        let mut scored: Vec<(f32, &SearchableRecord)> = self
            .store
            .records
            .iter()
            .filter_map(|record| {
                let tokens = lexemes(&record.searchable_text);
                parsed.score(&tokens).map(|score| (score, record))
            })
            .collect();

        // Stable sort keeps store order among equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn mode(&self) -> RetrievalMode {
        RetrievalMode::FullText
    }
}

/// Case-insensitive substring retriever over a [`MemoryStore`]
#[derive(Clone)]
pub struct MemorySubstringRetriever {
    store: MemoryStore,
}

#[async_trait::async_trait]
impl Retriever for MemorySubstringRetriever {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<SearchableRecord>> {
        let needle = query.to_lowercase();

        Ok(self
            .store
            .records
            .iter()
            .filter(|record| record.searchable_text.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    fn mode(&self) -> RetrievalMode {
        RetrievalMode::Substring
    }
}

/// One condition inside an AND group
#[derive(Debug, Clone, PartialEq)]
enum Clause {
    /// Lexeme sequence that must appear contiguously (a single word is a
    /// one-lexeme phrase)
    Require(Vec<String>),
    /// Lexeme sequence that must not appear
    Exclude(Vec<String>),
}

/// Parsed web-search query: OR of AND groups
#[derive(Debug, Clone, Default, PartialEq)]
struct WebQuery {
    groups: Vec<Vec<Clause>>,
}

fn query_lexer() -> &'static Regex {
    static LEXER: OnceLock<Regex> = OnceLock::new();
    LEXER.get_or_init(|| {
        Regex::new(r#"(-?)"([^"]*)"?|(\S+)"#).expect("query lexer pattern is valid")
    })
}

impl WebQuery {
    fn parse(query: &str) -> Self {
        let mut groups = Vec::new();
        let mut current: Vec<Clause> = Vec::new();

        for caps in query_lexer().captures_iter(query) {
            if let Some(phrase) = caps.get(2) {
                let words = lexemes(phrase.as_str());
                if words.is_empty() {
                    continue;
                }
                let negated = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
                current.push(if negated {
                    Clause::Exclude(words)
                } else {
                    Clause::Require(words)
                });
                continue;
            }

            let Some(word) = caps.get(3).map(|m| m.as_str()) else {
                continue;
            };

            if word.eq_ignore_ascii_case("or") {
                if !current.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
                continue;
            }

            if let Some(rest) = word.strip_prefix('-').filter(|r| !r.is_empty()) {
                let words = lexemes(rest);
                if !words.is_empty() {
                    current.push(Clause::Exclude(words));
                }
                continue;
            }

            current.extend(lexemes(word).into_iter().map(|w| Clause::Require(vec![w])));
        }

        if !current.is_empty() {
            groups.push(current);
        }

        Self { groups }
    }

    fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Best score over matching groups, or None when no group matches
    fn score(&self, tokens: &[String]) -> Option<f32> {
        self.groups
            .iter()
            .filter_map(|group| {
                let mut score = 0.0_f32;
                for clause in group {
                    match clause {
                        Clause::Require(seq) => {
                            let hits = occurrences(tokens, seq);
                            if hits == 0 {
                                return None;
                            }
                            score += hits as f32 * seq.len() as f32;
                        }
                        Clause::Exclude(seq) => {
                            if occurrences(tokens, seq) > 0 {
                                return None;
                            }
                        }
                    }
                }
                let length_norm = 1.0 + (tokens.len() as f32).ln_1p();
                Some(score / length_norm)
            })
            .fold(None, |best: Option<f32>, s| Some(best.map_or(s, |b| b.max(s))))
    }
}

fn occurrences(tokens: &[String], seq: &[String]) -> usize {
    if seq.is_empty() || seq.len() > tokens.len() {
        return 0;
    }
    tokens.windows(seq.len()).filter(|w| *w == seq).count()
}

/// Lowercased, stop-word filtered, lightly stemmed words
fn lexemes(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .map(|w| stem(&w))
        .collect()
}

fn stem(word: &str) -> String {
    if word.len() > 4 {
        if let Some(base) = word.strip_suffix("ies") {
            return format!("{}y", base);
        }
        if let Some(base) = word.strip_suffix("oes") {
            return format!("{}o", base);
        }
    }
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::test_support::record;

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            record(1, "onion price wholesale"),
            record(2, "Fresh tomatoes from Nashik, price per crate"),
            record(3, "Red onions onions onions, bulk supplier"),
            record(4, "Hub: cold storage and distribution for leafy greens"),
            record(5, "Potato 50% off_season stock"),
        ])
    }

    fn ids(records: &[SearchableRecord]) -> Vec<u128> {
        records.iter().map(|r| r.id.as_u128()).collect()
    }

    #[tokio::test]
    async fn test_default_store_is_empty() {
        let store = MemoryStore::default();
        assert!(store.is_empty());
        assert!(store.full_text().retrieve("onion", 10).await.unwrap().is_empty());
        assert!(store.substring().retrieve("onion", 5).await.unwrap().is_empty());
    }

    #[test]
    fn test_lexemes_normalize() {
        assert_eq!(lexemes("Onions, TOMATOES & berries"), vec!["onion", "tomato", "berry"]);
        assert_eq!(lexemes("price of the glass"), vec!["price", "glass"]);
    }

    #[test]
    fn test_parse_websearch_syntax() {
        let q = WebQuery::parse(r#"onion "cold storage" -garlic or potato"#);
        assert_eq!(
            q.groups,
            vec![
                vec![
                    Clause::Require(vec!["onion".into()]),
                    Clause::Require(vec!["cold".into(), "storage".into()]),
                    Clause::Exclude(vec!["garlic".into()]),
                ],
                vec![Clause::Require(vec!["potato".into()])],
            ]
        );
    }

    #[test]
    fn test_parse_stop_words_only_is_empty() {
        assert!(WebQuery::parse("the of and").is_empty());
        assert!(WebQuery::parse("  ").is_empty());
    }

    #[tokio::test]
    async fn test_full_text_requires_all_terms() {
        let results = store().full_text().retrieve("onion price", 10).await.unwrap();
        assert_eq!(ids(&results), vec![1]);
    }

    #[tokio::test]
    async fn test_full_text_ranks_by_frequency() {
        let results = store().full_text().retrieve("onions", 10).await.unwrap();
        assert_eq!(ids(&results), vec![3, 1]);
    }

    #[tokio::test]
    async fn test_full_text_or_and_exclusion() {
        let retriever = store().full_text();

        let results = retriever.retrieve("tomato or potato", 10).await.unwrap();
        assert_eq!(ids(&results).len(), 2);

        let results = retriever.retrieve("price -tomatoes", 10).await.unwrap();
        assert_eq!(ids(&results), vec![1]);
    }

    #[tokio::test]
    async fn test_full_text_phrase() {
        let retriever = store().full_text();
        let hits = retriever.retrieve(r#""cold storage""#, 10).await.unwrap();
        assert_eq!(ids(&hits), vec![4]);

        let misses = retriever.retrieve(r#""storage cold""#, 10).await.unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn test_full_text_limit() {
        let results = store().full_text().retrieve("onion", 1).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_substring_is_case_insensitive_and_literal() {
        let retriever = store().substring();

        let results = retriever.retrieve("ONION", 5).await.unwrap();
        assert_eq!(ids(&results), vec![1, 3]);

        let results = retriever.retrieve("50% off_", 5).await.unwrap();
        assert_eq!(ids(&results), vec![5]);

        let results = retriever.retrieve("50_", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_substring_keeps_store_order_and_limit() {
        let results = store().substring().retrieve("e", 2).await.unwrap();
        assert_eq!(ids(&results), vec![1, 2]);
    }
}
