//! `Aggregate`: pre: phase = `Aggregating`.
//!
//! Loads completed articles (no outbound calls), renders the digest, and
//! hands it to every registered publisher. Only on all publishers
//! succeeding does the phase advance to `Published`; any publisher
//! failure leaves the phase at `Aggregating` for the next tick to retry.

use chrono::NaiveDate;
use tracing::{error, info};

use digest_db::queries::tasks;

use crate::markdown::{digest_date_for_task, render_digest};

use super::context::HandlerContext;

pub async fn run(ctx: &HandlerContext, date: NaiveDate) -> anyhow::Result<()> {
    let completed = tasks::list_completed(&ctx.pool, date).await?;
    let digest_date = digest_date_for_task(date);
    let markdown = render_digest(digest_date, &completed);

    match ctx.publishers.publish_all(&markdown, digest_date).await {
        Ok(()) => {
            tasks::mark_published(&ctx.pool, date).await?;
            info!(task_date = %date, article_count = completed.len(), "Aggregate published digest");
            Ok(())
        }
        Err(e) => {
            error!(task_date = %date, error = %e, "publisher failure; will retry Aggregate next tick");
            Err(e)
        }
    }
}

/// `force-publish`: skip the aggregate-gating (allows `failed` > 0),
/// runs the same render-and-publish path directly regardless of current
/// phase, provided at least one completed article exists.
pub async fn force_publish(ctx: &HandlerContext, date: NaiveDate) -> anyhow::Result<()> {
    let completed_count = tasks::count_completed(&ctx.pool, date).await?;
    if completed_count == 0 {
        anyhow::bail!("force-publish precondition failed: no completed articles for {date}");
    }

    let completed = tasks::list_completed(&ctx.pool, date).await?;
    let digest_date = digest_date_for_task(date);
    let markdown = render_digest(digest_date, &completed);

    ctx.publishers.publish_all(&markdown, digest_date).await?;
    tasks::mark_published(&ctx.pool, date).await?;

    info!(task_date = %date, "force-publish succeeded");
    Ok(())
}
