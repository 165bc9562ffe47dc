//! `digestd status [--date]` command: show a day's task phase, counters,
//! and recent batch records.

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;

use digest_db::queries::tasks;

/// Run the status command for `date`, defaulting to today (UTC) when unset.
pub async fn run_status(pool: &PgPool, date: Option<NaiveDate>) -> Result<()> {
    let date = date.unwrap_or_else(digest_core::driver::today);

    let Some(progress) = tasks::get_progress(pool, date).await? else {
        println!("No task exists for {date}.");
        return Ok(());
    };

    let task = &progress.task;
    println!("Task date: {date}");
    println!("Phase:     {}", task.phase);
    println!(
        "Articles:  total={} completed={} failed={}",
        task.total_articles, task.completed_articles, task.failed_articles
    );
    println!(
        "Status:    pending={} processing={} completed={} failed={}",
        progress.counts.pending, progress.counts.processing, progress.counts.completed, progress.counts.failed
    );
    if let Some(published_at) = task.published_at {
        println!("Published: {}", published_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!();

    let batches = tasks::recent_batches(pool, date, 10).await?;
    if batches.is_empty() {
        println!("No batches recorded yet.");
    } else {
        println!("Recent batches:");
        for batch in &batches {
            println!(
                "  #{:<3} articles={:<3} subrequests={:<3} duration={:>6}ms status={}",
                batch.batch_index, batch.article_count, batch.subrequest_count, batch.duration_ms, batch.status
            );
        }
    }

    Ok(())
}
