use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TOKENS: usize = 4000;

/// Budgets outside this range still work, they are just unusual for chat models.
pub const RECOMMENDED_MAX_TOKENS: std::ops::RangeInclusive<usize> = 1000..=40000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based position in the conversation sequence.
    pub number: usize,
    pub content: String,
    pub sentence_count: usize,
    /// Running estimate at the moment the page was closed.
    pub estimated_tokens: usize,
}

impl Page {
    pub fn as_str(&self) -> &str {
        &self.content
    }
}

/// Outcome of probing one page. An empty description means no anomaly
/// was found or the page was never checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub description: String,
}

impl AnomalyResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn detected(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }

    pub fn is_anomalous(&self) -> bool {
        !self.description.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleMetadata {
    pub filename: String,
    pub source_type: SourceType,
    pub fetched_at: String,
    pub total_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SourceType {
    LocalFile,
    Url,
    Stdin,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginationSummary {
    pub max_tokens: usize,
    pub total_pages: usize,
    pub sentence_count: usize,
    pub article_tokens: usize,
    pub largest_page_tokens: usize,
    /// Pages whose running estimate ended above the budget because a single
    /// sentence could not be split.
    pub oversized_pages: Vec<usize>,
}
