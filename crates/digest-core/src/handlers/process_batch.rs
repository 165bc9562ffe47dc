//! `ProcessBatch`: pre: phase in {`ListFetched`, `Processing`}.
//!
//! Claims a bounded batch of pending articles, enriches each in parallel
//! (article fetch, comment fetch, article summary, comment summary), and
//! writes all outcomes back in one transaction. Advances to `Aggregating`
//! exactly when a claim returns empty -- the termination condition.

use std::time::Instant;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tracing::info;
use uuid::Uuid;

use digest_db::models::{Article, ArticleOutcome, ArticleStatus, BatchRecord, BatchStatus, TaskPhase};
use digest_db::queries::tasks;

use crate::state::TaskPhaseMachine;

use super::context::HandlerContext;

/// Run one `ProcessBatch` tick. Returns `true` if a batch was claimed and
/// processed, `false` if the claim was empty (work for this date is done
/// and the phase advanced to `Aggregating`).
pub async fn run(ctx: &HandlerContext, date: NaiveDate) -> anyhow::Result<bool> {
    let batch_size = ctx.config.batch_size as u32;
    ctx.budget.validate_batch_size(batch_size)?;
    ctx.budget.assert_within_budget(crate::budget::estimate_calls(batch_size))?;

    let claimed = tasks::claim_pending_batch(
        &ctx.pool,
        date,
        ctx.config.batch_size,
        ctx.config.processing_timeout_secs,
    )
    .await?;

    // Read the phase *after* claiming so a concurrent tick's claim is
    // reflected: whichever tick's claim comes back empty transitions from
    // whatever phase the task is actually in (`ListFetched` or
    // `Processing`), not a phase read before the race was resolved.
    let current_phase = tasks::get_task(&ctx.pool, date)
        .await?
        .map(|t| t.phase)
        .unwrap_or(TaskPhase::ListFetched);

    if claimed.is_empty() {
        TaskPhaseMachine::transition(&ctx.pool, date, current_phase, TaskPhase::Aggregating).await?;
        return Ok(false);
    }

    if current_phase == TaskPhase::ListFetched {
        TaskPhaseMachine::transition(&ctx.pool, date, TaskPhase::ListFetched, TaskPhase::Processing).await?;
    }

    let started = Instant::now();
    let outcomes = process_articles(ctx, &claimed).await;

    let completed_count = outcomes
        .iter()
        .filter(|o| o.status == ArticleStatus::Completed)
        .count();
    let failed_count = outcomes.len() - completed_count;

    tasks::complete_articles(&ctx.pool, date, &outcomes).await?;

    let batch_status = if failed_count == 0 {
        BatchStatus::Success
    } else if completed_count == 0 {
        BatchStatus::Failed
    } else {
        BatchStatus::Partial
    };

    let batch_index = tasks::count_batches(&ctx.pool, date).await?;
    let record = BatchRecord {
        id: Uuid::new_v4(),
        task_date: date,
        batch_index,
        article_count: claimed.len() as i32,
        subrequest_count: crate::budget::estimate_calls(claimed.len() as u32) as i32,
        duration_ms: started.elapsed().as_millis() as i32,
        status: batch_status,
        error_message: None,
        created_at: chrono::Utc::now(),
    };
    tasks::record_batch(&ctx.pool, &record).await?;

    info!(
        task_date = %date,
        batch_index,
        completed = completed_count,
        failed = failed_count,
        "ProcessBatch complete"
    );

    Ok(true)
}

async fn process_articles(ctx: &HandlerContext, claimed: &[Article]) -> Vec<ArticleOutcome> {
    let batch_size = claimed.len().max(1);
    stream::iter(claimed.iter())
        .map(|article| process_one(ctx, article))
        .buffer_unordered(batch_size)
        .collect()
        .await
}

async fn process_one(ctx: &HandlerContext, article: &Article) -> ArticleOutcome {
    let title_zh = match &article.title_zh {
        Some(title) => Some(title.clone()),
        None => match ctx.translator.translate_titles(std::slice::from_ref(&article.title_en)).await {
            Ok(mut titles) if titles.len() == 1 => Some(titles.remove(0)),
            _ => None,
        },
    };

    let fetch_result = ctx.article_fetcher.fetch(&article.url).await;
    let comments_result = ctx.news_source.fetch_comments(article.story_id).await;

    let (content_summary, comment_summary) = match (fetch_result, comments_result) {
        (Ok(fetched), Ok(comments)) => {
            let content_summary = ctx.summarizer.summarize_article(&fetched.content).await;
            let comment_summary = if comments.is_empty() {
                Ok(String::new())
            } else {
                ctx.summarizer.summarize_comments(&comments).await
            };
            (content_summary, comment_summary)
        }
        (Err(e), _) => (Err(e), Ok(String::new())),
        (_, Err(e)) => (Err(anyhow::anyhow!("comment fetch failed")), Err(e)),
    };

    match (content_summary, comment_summary) {
        (Ok(content), Ok(comments)) => ArticleOutcome {
            id: article.id,
            status: ArticleStatus::Completed,
            title_zh,
            content_summary_zh: Some(content),
            comment_summary_zh: Some(comments),
            error_message: None,
        },
        (Err(e), _) | (_, Err(e)) => ArticleOutcome {
            id: article.id,
            status: ArticleStatus::Failed,
            title_zh,
            content_summary_zh: None,
            comment_summary_zh: None,
            error_message: Some(e.to_string()),
        },
    }
}
