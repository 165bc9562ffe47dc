//! [`HandlerContext`]: the collaborators and tunables a phase handler
//! needs, built once per tick and passed in explicitly. No process-global
//! mutable state.

use std::sync::Arc;

use sqlx::PgPool;

use crate::budget::BudgetGuard;
use crate::collaborators::{ArticleFetcher, ContentFilter, NewsSource, PublisherSet, Summarizer, Translator};

/// Tunables resolved from configuration (see `digest-cli`'s config
/// resolution chain).
#[derive(Debug, Clone, Copy)]
pub struct HandlerConfig {
    pub batch_size: i32,
    pub max_retry_count: i32,
    pub processing_timeout_secs: i64,
    pub hn_story_limit: usize,
    pub hn_time_window_hours: i64,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            batch_size: 6,
            max_retry_count: 3,
            processing_timeout_secs: 300,
            hn_story_limit: 30,
            hn_time_window_hours: 24,
        }
    }
}

/// Constructor-injected collaborators and configuration for one Driver
/// tick. Built once by the caller (the CLI's `tick` command, or the HTTP
/// control API's `trigger` handler) and threaded through every phase
/// handler invocation for that tick.
pub struct HandlerContext {
    pub pool: PgPool,
    pub news_source: Arc<dyn NewsSource>,
    pub article_fetcher: Arc<dyn ArticleFetcher>,
    pub translator: Arc<dyn Translator>,
    pub summarizer: Arc<dyn Summarizer>,
    pub content_filter: Arc<dyn ContentFilter>,
    pub publishers: PublisherSet,
    pub budget: BudgetGuard,
    pub config: HandlerConfig,
}
