//! End-to-end Driver tests against a real database, with fake
//! collaborators standing in for the news source, fetcher, translator,
//! summarizer, and publisher. Exercises the full phase sequence
//! `Init -> ListFetched -> Processing -> Aggregating -> Published`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use digest_core::budget::{BudgetConfig, BudgetGuard};
use digest_core::collaborators::{
    ArticleFetcher, CandidateStory, ContentFilter, FetchedArticle, NewsSource, NoopContentFilter,
    Publisher, PublisherSet, Summarizer, Translator,
};
use digest_core::driver::run_tick;
use digest_core::handlers::{HandlerConfig, HandlerContext};
use digest_db::models::TaskPhase;
use digest_db::queries::tasks;
use digest_test_utils::{create_test_db, drop_test_db};

struct FakeNewsSource {
    count: usize,
}

#[async_trait]
impl NewsSource for FakeNewsSource {
    async fn fetch_stories(
        &self,
        _window_start: DateTime<Utc>,
        _window_end: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<CandidateStory>> {
        Ok((0..self.count.min(limit))
            .map(|i| CandidateStory {
                story_id: i as i64,
                url: format!("https://example.com/{i}"),
                title_en: format!("Story {i}"),
                score: 100 - i as i32,
                published_time: Utc::now(),
            })
            .collect())
    }

    async fn fetch_comments(&self, _story_id: i64) -> anyhow::Result<Vec<String>> {
        Ok(vec!["a comment".to_owned()])
    }
}

struct FakeArticleFetcher;

#[async_trait]
impl ArticleFetcher for FakeArticleFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<FetchedArticle> {
        Ok(FetchedArticle {
            content: format!("content for {url}"),
            description: "desc".to_owned(),
        })
    }
}

struct FakeTranslator;

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate_titles(&self, titles: &[String]) -> anyhow::Result<Vec<String>> {
        Ok(titles.iter().map(|t| format!("[zh] {t}")).collect())
    }
}

struct FakeSummarizer;

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize_article(&self, text: &str) -> anyhow::Result<String> {
        Ok(format!("summary: {text}"))
    }

    async fn summarize_comments(&self, texts: &[String]) -> anyhow::Result<String> {
        Ok(format!("comment summary of {} comments", texts.len()))
    }
}

struct RecordingPublisher {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Publisher for RecordingPublisher {
    fn name(&self) -> &str {
        "recording"
    }

    async fn publish(&self, _markdown: &str, _date: NaiveDate) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn make_context(pool: sqlx::PgPool, story_count: usize, publish_calls: Arc<AtomicUsize>) -> HandlerContext {
    let mut publishers = PublisherSet::new();
    publishers.add(Arc::new(RecordingPublisher { calls: publish_calls }));

    HandlerContext {
        pool,
        news_source: Arc::new(FakeNewsSource { count: story_count }),
        article_fetcher: Arc::new(FakeArticleFetcher),
        translator: Arc::new(FakeTranslator),
        summarizer: Arc::new(FakeSummarizer),
        content_filter: Arc::new(NoopContentFilter),
        publishers,
        budget: BudgetGuard::new(BudgetConfig::default()),
        config: HandlerConfig {
            batch_size: 6,
            ..HandlerConfig::default()
        },
    }
}

#[tokio::test]
async fn happy_path_drives_task_to_published() {
    let (pool, db_name) = create_test_db().await;
    let publish_calls = Arc::new(AtomicUsize::new(0));
    let ctx = make_context(pool.clone(), 10, publish_calls.clone());

    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();

    // Tick 1: Init -> ListFetched (FetchList fused with Init).
    let outcome = run_tick(&ctx, date).await.unwrap();
    assert_eq!(outcome.phase_after, TaskPhase::ListFetched);
    assert!(outcome.error.is_none());

    // Tick batches of up to 6, 10 stories: two ProcessBatch ticks, then
    // one more tick whose claim is empty and advances to Aggregating.
    loop {
        let outcome = run_tick(&ctx, date).await.unwrap();
        assert!(outcome.error.is_none());
        if outcome.phase_after == TaskPhase::Aggregating {
            break;
        }
    }

    // Final tick: Aggregate publishes and marks Published.
    let outcome = run_tick(&ctx, date).await.unwrap();
    assert_eq!(outcome.phase_after, TaskPhase::Published);
    assert!(outcome.error.is_none());
    assert_eq!(publish_calls.load(Ordering::SeqCst), 1);

    let progress = tasks::get_progress(&pool, date).await.unwrap().unwrap();
    assert_eq!(progress.task.completed_articles, 10);
    assert_eq!(progress.task.failed_articles, 0);
    assert!(progress.task.published_at.is_some());

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn rollover_archives_prior_day_published_task() {
    let (pool, db_name) = create_test_db().await;
    let yesterday = NaiveDate::from_ymd_opt(2025, 1, 14).unwrap();
    let today = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();

    tasks::get_or_create_task(&pool, yesterday).await.unwrap();
    tasks::advance_phase(&pool, yesterday, TaskPhase::Init, TaskPhase::ListFetched)
        .await
        .unwrap();
    tasks::advance_phase(&pool, yesterday, TaskPhase::ListFetched, TaskPhase::Aggregating)
        .await
        .unwrap();
    tasks::advance_phase(&pool, yesterday, TaskPhase::Aggregating, TaskPhase::Published)
        .await
        .unwrap();

    let publish_calls = Arc::new(AtomicUsize::new(0));
    let ctx = make_context(pool.clone(), 0, publish_calls);

    let outcome = run_tick(&ctx, today).await.unwrap();
    assert_eq!(outcome.task_date, today);

    let old = tasks::get_task(&pool, yesterday).await.unwrap().unwrap();
    assert_eq!(old.phase, TaskPhase::Archived);

    let new_task = tasks::get_task(&pool, today).await.unwrap().unwrap();
    assert_eq!(new_task.task_date, today);

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn terminal_phase_tick_is_a_noop() {
    let (pool, db_name) = create_test_db().await;
    let publish_calls = Arc::new(AtomicUsize::new(0));
    let ctx = make_context(pool.clone(), 0, publish_calls.clone());

    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();

    // Zero stories: Init -> ListFetched (zero rows) -> Aggregating ->
    // Published happens over a couple of ticks even with no articles,
    // since an empty digest is still a valid publish.
    for _ in 0..4 {
        let outcome = run_tick(&ctx, date).await.unwrap();
        if outcome.phase_after == TaskPhase::Published {
            break;
        }
    }

    let before = tasks::get_task(&pool, date).await.unwrap().unwrap();
    assert_eq!(before.phase, TaskPhase::Published);

    let outcome = run_tick(&ctx, date).await.unwrap();
    assert_eq!(outcome.phase_after, TaskPhase::Published);
    assert_eq!(outcome.phase_before, TaskPhase::Published);

    drop_test_db(&db_name).await;
}
