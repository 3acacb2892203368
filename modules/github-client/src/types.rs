use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response envelope for `GET /search/repositories`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub total_count: u64,
    pub incomplete_results: bool,
    pub items: Vec<Repo>,
}

/// A repository as returned by the GitHub search API.
/// Only the fields the pipeline consumes are deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repo {
    pub id: u64,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub stargazers_count: u32,
    pub language: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
}

/// Sort key accepted by the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Stars,
    Updated,
    /// Provider default: best-match relevance scoring.
    BestMatch,
}

impl SortKey {
    pub fn as_query_param(&self) -> Option<&'static str> {
        match self {
            SortKey::Stars => Some("stars"),
            SortKey::Updated => Some("updated"),
            SortKey::BestMatch => None,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_query_param(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}
