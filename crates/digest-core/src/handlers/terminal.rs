//! Republish / Terminal: pre: phase in {`Published`, `Archived`}.
//!
//! A no-op that logs and returns immediately -- the steady state between a
//! day's completion and the next day rolling over.

use chrono::NaiveDate;
use tracing::info;

use digest_db::models::TaskPhase;

pub async fn run(date: NaiveDate, phase: TaskPhase) -> anyhow::Result<()> {
    info!(task_date = %date, %phase, "terminal phase, no-op");
    Ok(())
}
