//! Shared value types passed across the collaborator trait boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate story surfaced by the news aggregator, before filtering or
/// persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateStory {
    pub story_id: i64,
    pub url: String,
    pub title_en: String,
    pub score: i32,
    pub published_time: DateTime<Utc>,
}

/// The result of fetching a single article's page content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchedArticle {
    pub content: String,
    pub description: String,
}
