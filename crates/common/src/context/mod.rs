//! Context builder
//!
//! Turns merged candidates into the grounding instruction sent to the
//! generator:
//! - Projects each record to `{type, title, description, metadata}`
//! - Applies the character budget on the serialized context
//! - Renders the instruction with audience-specific framing

use crate::config::RetrievalConfig;
use crate::errors::Result;
use crate::retrieval::SearchableRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audience the answer is written for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Vendor,
    /// Also the framing used for unknown or missing labels
    #[default]
    Hub,
}

impl UserType {
    /// Parse a caller-supplied label, falling back to hub framing
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some(l) if l.eq_ignore_ascii_case("vendor") => UserType::Vendor,
            Some(l) if l.eq_ignore_ascii_case("hub") => UserType::Hub,
            other => {
                tracing::warn!(user_type = ?other, "Unsupported userType, using hub framing");
                UserType::Hub
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Vendor => "vendor",
            UserType::Hub => "hub",
        }
    }

    fn audience(&self) -> &'static str {
        match self {
            UserType::Vendor => "vendors",
            UserType::Hub => "hubs",
        }
    }

    /// Closing clause that biases the answer toward this audience
    pub fn framing(&self) -> &'static str {
        match self {
            UserType::Vendor => "Focus on product information and pricing.",
            UserType::Hub => "Focus on vendor information and distribution details.",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimal projection of a record handed to the generator and echoed back as a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    #[serde(rename = "type")]
    pub content_type: String,
    pub title: String,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl From<&SearchableRecord> for ContextEntry {
    fn from(record: &SearchableRecord) -> Self {
        Self {
            content_type: record.content_type.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            metadata: record.metadata.clone(),
        }
    }
}

/// Result of context building
#[derive(Debug, Clone)]
pub struct GroundingContext {
    /// Entries included in the instruction, in merged order
    pub entries: Vec<ContextEntry>,

    /// Candidates dropped by the character budget
    pub dropped: usize,

    /// System-level instruction for the generator
    pub instruction: String,
}

/// Context builder configuration
#[derive(Debug, Clone)]
pub struct ContextBuilderConfig {
    /// Maximum length of the serialized context block, in characters
    pub max_context_chars: usize,
}

impl Default for ContextBuilderConfig {
    fn default() -> Self {
        Self {
            max_context_chars: RetrievalConfig::default().max_context_chars,
        }
    }
}

impl From<&RetrievalConfig> for ContextBuilderConfig {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            max_context_chars: config.max_context_chars,
        }
    }
}

/// Builds grounding instructions from merged candidates
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: ContextBuilderConfig,
}

impl ContextBuilder {
    pub fn new(config: ContextBuilderConfig) -> Self {
        Self { config }
    }

    /// Project, budget and render
    pub fn build(
        &self,
        candidates: &[SearchableRecord],
        user_type: UserType,
    ) -> Result<GroundingContext> {
        let projected: Vec<ContextEntry> = candidates.iter().map(ContextEntry::from).collect();
        let (entries, block) = self.fit_budget(projected)?;
        let dropped = candidates.len() - entries.len();

        if dropped > 0 {
            tracing::warn!(
                dropped,
                kept = entries.len(),
                budget = self.config.max_context_chars,
                "Context budget exceeded, dropping trailing candidates"
            );
        }

        Ok(GroundingContext {
            instruction: render_instruction(&block, user_type),
            entries,
            dropped,
        })
    }

    /// Keep the longest prefix whose serialized form fits the budget.
    ///
    /// The top-ranked entry is never dropped; when it alone is over budget its
    /// description is shortened instead.
    fn fit_budget(&self, mut entries: Vec<ContextEntry>) -> Result<(Vec<ContextEntry>, String)> {
        let budget = self.config.max_context_chars;
        loop {
            let block = serde_json::to_string_pretty(&entries)?;
            let size = block.chars().count();
            if size <= budget {
                return Ok((entries, block));
            }
            if entries.len() > 1 {
                entries.pop();
                continue;
            }

            let Some(description) = entries
                .first_mut()
                .and_then(|entry| entry.description.as_mut())
                .filter(|description| !description.is_empty())
            else {
                return Ok((entries, block));
            };
            let keep = description.chars().count().saturating_sub(size - budget);
            *description = description.chars().take(keep).collect();
        }
    }
}

fn render_instruction(context_block: &str, user_type: UserType) -> String {
    format!(
        "You are an AI assistant for a vegetable marketplace called Sabzi Saathi.\n\
         You help {audience} find information about products, vendors, and hubs.\n\
         \n\
         Answer only from the available data context below. \
         If the data doesn't contain relevant information, say so clearly.\n\
         \n\
         Available data context:\n\
         {context}\n\
         \n\
         User type: {label}\n\
         \n\
         Provide responses in a helpful, concise manner. \
         If suggesting products, include prices and units when available.\n\
         {framing}",
        audience = user_type.audience(),
        context = context_block,
        label = user_type.as_str(),
        framing = user_type.framing(),
    )
}
