//! State Machine Driver: the entry point on every scheduled tick (and
//! every manual `trigger`). Resolves today's task, handles day rollover,
//! dispatches to the phase handler, and records the tick outcome.

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use digest_db::models::TaskPhase;
use digest_db::queries::tasks;

use crate::handlers::{aggregate, fetch_list, process_batch, terminal, HandlerContext};

/// Outcome of a single Driver tick, for logging and the HTTP `trigger`
/// response body.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub task_date: NaiveDate,
    pub phase_before: TaskPhase,
    pub phase_after: TaskPhase,
    pub error: Option<String>,
}

/// Run one Driver tick for `today`. A handler error ends the tick cleanly
/// without changing the phase (beyond whatever the handler already
/// committed before failing); the next tick re-attempts.
pub async fn run_tick(ctx: &HandlerContext, today: NaiveDate) -> anyhow::Result<TickOutcome> {
    for archived_date in tasks::archive_stale_published(&ctx.pool, today).await? {
        info!(task_date = %archived_date, "day rollover: archived prior-day Published task");
    }

    if let Some(stale) = tasks::find_stale_task(&ctx.pool, today).await? {
        warn!(task_date = %stale.task_date, phase = %stale.phase, "StaleTaskWarning: prior-day task not yet published");
    }

    let task = tasks::get_or_create_task(&ctx.pool, today).await?;
    let phase_before = task.phase;

    let result = dispatch(ctx, today, phase_before).await;

    let phase_after = tasks::get_task(&ctx.pool, today)
        .await?
        .map(|t| t.phase)
        .unwrap_or(phase_before);

    let outcome = TickOutcome {
        task_date: today,
        phase_before,
        phase_after,
        error: result.as_ref().err().map(|e| e.to_string()),
    };

    info!(
        task_date = %outcome.task_date,
        phase_before = %outcome.phase_before,
        phase_after = %outcome.phase_after,
        error = outcome.error.as_deref().unwrap_or(""),
        "tick complete"
    );

    Ok(outcome)
}

async fn dispatch(ctx: &HandlerContext, date: NaiveDate, phase: TaskPhase) -> anyhow::Result<()> {
    match phase {
        TaskPhase::Init => fetch_list::run(ctx, date).await,
        TaskPhase::ListFetched | TaskPhase::Processing => {
            process_batch::run(ctx, date).await.map(|_| ())
        }
        TaskPhase::Aggregating => aggregate::run(ctx, date).await,
        TaskPhase::Published | TaskPhase::Archived => terminal::run(date, phase).await,
    }
}

/// The current UTC calendar date, as the Driver sees it on each tick.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
