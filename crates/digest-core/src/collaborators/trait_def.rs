//! Collaborator trait definitions -- the five external-service contracts
//! the core consumes but does not implement the business logic of.
//!
//! Every trait here is intentionally object-safe so implementations can be
//! stored as `Arc<dyn Trait>` / `Box<dyn Trait>` and constructor-injected
//! into a [`crate::handlers::HandlerContext`] per tick, per the
//! "no process-global mutable state" guidance this crate follows.

use std::time::Duration;

use async_trait::async_trait;

use super::types::{CandidateStory, FetchedArticle};

/// Default per-call timeout for the article fetcher.
pub const ARTICLE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Default per-call timeout for LLM translate/summarize calls.
pub const LLM_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the news aggregator: story lists and comment bodies.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Fetch the top stories published within the given UTC window,
    /// ordered by descending score.
    async fn fetch_stories(
        &self,
        window_start: chrono::DateTime<chrono::Utc>,
        window_end: chrono::DateTime<chrono::Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<CandidateStory>>;

    /// Fetch the top comment bodies for a story.
    async fn fetch_comments(&self, story_id: i64) -> anyhow::Result<Vec<String>>;
}

/// Headless-browser-backed fetcher for a single article's page content.
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<FetchedArticle>;
}

/// Batch title translation (English -> Chinese).
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate a batch of titles in one call. A shape mismatch in the
    /// response (wrong length) is treated as a whole-batch failure by the
    /// caller, not a partial result here.
    async fn translate_titles(&self, titles: &[String]) -> anyhow::Result<Vec<String>>;
}

/// LLM-backed summarization of article content and comment threads.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize_article(&self, text: &str) -> anyhow::Result<String>;
    async fn summarize_comments(&self, texts: &[String]) -> anyhow::Result<String>;
}

/// Optional, deterministic pre-filter over candidate stories. The default
/// is a no-op that passes every story through.
pub trait ContentFilter: Send + Sync {
    fn filter(&self, stories: Vec<CandidateStory>) -> Vec<CandidateStory>;
}

/// A no-op [`ContentFilter`] that returns its input unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopContentFilter;

impl ContentFilter for NoopContentFilter {
    fn filter(&self, stories: Vec<CandidateStory>) -> Vec<CandidateStory> {
        stories
    }
}

/// A sink that receives the rendered daily digest. Publishers MUST be
/// idempotent for the same date (dedup key: the date itself, e.g. the
/// `YYYY-MM-DD.md` file path).
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Human-readable name, used in logs and error messages.
    fn name(&self) -> &str;

    /// Publish the rendered markdown document for `date`.
    async fn publish(&self, markdown: &str, date: chrono::NaiveDate) -> anyhow::Result<()>;
}

// Compile-time assertions: every collaborator trait must be object-safe.
const _: () = {
    fn _assert_news_source(_: &dyn NewsSource) {}
    fn _assert_article_fetcher(_: &dyn ArticleFetcher) {}
    fn _assert_translator(_: &dyn Translator) {}
    fn _assert_summarizer(_: &dyn Summarizer) {}
    fn _assert_content_filter(_: &dyn ContentFilter) {}
    fn _assert_publisher(_: &dyn Publisher) {}
};
