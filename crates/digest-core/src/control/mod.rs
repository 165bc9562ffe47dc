//! Status/Control API: the operator-facing surface over the Task Store,
//! shared verbatim between the CLI and the HTTP server. Every function
//! here is a thin, composable wrapper -- neither surface holds logic of
//! its own beyond argument parsing and response formatting.

use chrono::NaiveDate;
use serde::Serialize;

use digest_db::models::TaskProgress;
use digest_db::queries::tasks;

use crate::driver::{self, TickOutcome};
use crate::handlers::{aggregate, HandlerContext};

/// `GET /status?date=` / `digestd status`: a read-only snapshot of a
/// task's phase and article counters. Returns `None` if no task has ever
/// been created for `date`.
pub async fn get_status(ctx: &HandlerContext, date: NaiveDate) -> anyhow::Result<Option<TaskProgress>> {
    let progress = tasks::get_progress(&ctx.pool, date).await?;
    Ok(progress)
}

/// Outcome of a `retry` call, returned to both CLI and HTTP callers.
#[derive(Debug, Serialize)]
pub struct RetryOutcome {
    pub task_date: NaiveDate,
    pub requeued: u64,
}

/// `POST /retry?date=` / `digestd retry --date`: reset failed-but-under-
/// `maxRetries` articles back to `pending`, reopening the phase if the
/// task had already reached `Aggregating` or `Published`.
pub async fn retry_failed(ctx: &HandlerContext, date: NaiveDate) -> anyhow::Result<RetryOutcome> {
    let requeued = tasks::retry_failed(&ctx.pool, date, ctx.config.max_retry_count).await?;
    Ok(RetryOutcome { task_date: date, requeued })
}

/// `POST /force-publish?date=` / `digestd force-publish --date`: render
/// and publish whatever articles are currently `completed`, bypassing the
/// normal `Aggregating`-only precondition. Fails if no article has
/// completed yet.
pub async fn force_publish(ctx: &HandlerContext, date: NaiveDate) -> anyhow::Result<()> {
    aggregate::force_publish(ctx, date).await
}

/// `POST /trigger` / `digestd tick`: run exactly one Driver tick for
/// `date` synchronously and return its outcome.
pub async fn trigger(ctx: &HandlerContext, date: NaiveDate) -> anyhow::Result<TickOutcome> {
    driver::run_tick(ctx, date).await
}
