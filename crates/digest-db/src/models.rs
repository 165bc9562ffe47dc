use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Phase of a [`DailyTask`] in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    Init,
    ListFetched,
    Processing,
    Aggregating,
    Published,
    Archived,
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::ListFetched => "list_fetched",
            Self::Processing => "processing",
            Self::Aggregating => "aggregating",
            Self::Published => "published",
            Self::Archived => "archived",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskPhase {
    type Err = TaskPhaseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Self::Init),
            "list_fetched" => Ok(Self::ListFetched),
            "processing" => Ok(Self::Processing),
            "aggregating" => Ok(Self::Aggregating),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(TaskPhaseParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskPhase`] string.
#[derive(Debug, Clone)]
pub struct TaskPhaseParseError(pub String);

impl fmt::Display for TaskPhaseParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task phase: {:?}", self.0)
    }
}

impl std::error::Error for TaskPhaseParseError {}

// ---------------------------------------------------------------------------

/// Status of an individual [`Article`] within a task's workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for ArticleStatus {
    type Err = ArticleStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(ArticleStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ArticleStatus`] string.
#[derive(Debug, Clone)]
pub struct ArticleStatusParseError(pub String);

impl fmt::Display for ArticleStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid article status: {:?}", self.0)
    }
}

impl std::error::Error for ArticleStatusParseError {}

// ---------------------------------------------------------------------------

/// Aggregate outcome of a single executed batch, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Success,
    Partial,
    Failed,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for BatchStatus {
    type Err = BatchStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "partial" => Ok(Self::Partial),
            "failed" => Ok(Self::Failed),
            other => Err(BatchStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`BatchStatus`] string.
#[derive(Debug, Clone)]
pub struct BatchStatusParseError(pub String);

impl fmt::Display for BatchStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid batch status: {:?}", self.0)
    }
}

impl std::error::Error for BatchStatusParseError {}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// One row per calendar day (UTC) of digest production.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyTask {
    pub id: Uuid,
    pub task_date: NaiveDate,
    pub phase: TaskPhase,
    pub total_articles: i32,
    pub completed_articles: i32,
    pub failed_articles: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// One row per story in a day's workload.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub id: Uuid,
    pub task_date: NaiveDate,
    pub story_id: i64,
    pub rank: i32,
    pub url: String,
    pub title_en: String,
    pub title_zh: Option<String>,
    pub score: i32,
    pub published_time: DateTime<Utc>,
    pub content_summary_zh: Option<String>,
    pub comment_summary_zh: Option<String>,
    pub status: ArticleStatus,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single candidate story, as returned by [`ArticleStatus::Pending`]
/// insertion inputs before a surrogate id is assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArticle {
    pub story_id: i64,
    pub rank: i32,
    pub url: String,
    pub title_en: String,
    pub title_zh: Option<String>,
    pub score: i32,
    pub published_time: DateTime<Utc>,
}

/// The outcome of processing one claimed article, ready to be written back
/// in a single [`crate::queries::tasks::complete_articles`] transaction.
#[derive(Debug, Clone)]
pub struct ArticleOutcome {
    pub id: Uuid,
    pub status: ArticleStatus,
    pub title_zh: Option<String>,
    pub content_summary_zh: Option<String>,
    pub comment_summary_zh: Option<String>,
    pub error_message: Option<String>,
}

/// One row per executed batch, for observability. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BatchRecord {
    pub id: Uuid,
    pub task_date: NaiveDate,
    pub batch_index: i32,
    pub article_count: i32,
    pub subrequest_count: i32,
    pub duration_ms: i32,
    pub status: BatchStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-status article counts for a given task date, as returned by
/// [`crate::queries::tasks::get_progress`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ArticleStatusCounts {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}

/// Read-only progress snapshot for a task date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProgress {
    pub task: DailyTask,
    pub counts: ArticleStatusCounts,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_phase_display_roundtrip() {
        let variants = [
            TaskPhase::Init,
            TaskPhase::ListFetched,
            TaskPhase::Processing,
            TaskPhase::Aggregating,
            TaskPhase::Published,
            TaskPhase::Archived,
        ];
        for v in &variants {
            let s = v.to_string();
            let parsed: TaskPhase = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn task_phase_invalid() {
        let result = "bogus".parse::<TaskPhase>();
        assert!(result.is_err());
    }

    #[test]
    fn article_status_display_roundtrip() {
        let variants = [
            ArticleStatus::Pending,
            ArticleStatus::Processing,
            ArticleStatus::Completed,
            ArticleStatus::Failed,
        ];
        for v in &variants {
            let s = v.to_string();
            let parsed: ArticleStatus = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn article_status_invalid() {
        let result = "nope".parse::<ArticleStatus>();
        assert!(result.is_err());
    }

    #[test]
    fn batch_status_display_roundtrip() {
        let variants = [BatchStatus::Success, BatchStatus::Partial, BatchStatus::Failed];
        for v in &variants {
            let s = v.to_string();
            let parsed: BatchStatus = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn batch_status_invalid() {
        let result = "unknown".parse::<BatchStatus>();
        assert!(result.is_err());
    }
}
