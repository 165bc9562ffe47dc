//! Database query functions for the `daily_tasks`, `articles`, and
//! `task_batches` tables.
//!
//! `claim_pending_batch` is the one concurrency-sensitive operation in this
//! module: a single `UPDATE ... RETURNING` statement so that two concurrent
//! ticks cannot both claim the same article row.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Article, ArticleOutcome, ArticleStatus, ArticleStatusCounts, BatchRecord, BatchStatus,
    DailyTask, NewArticle, TaskPhase, TaskProgress,
};

/// Fetch the `DailyTask` row for `date`, creating an `Init` row if absent.
///
/// Uses `INSERT ... ON CONFLICT DO NOTHING` followed by a `SELECT` so that
/// concurrent creators race on the insert but converge on the same row.
pub async fn get_or_create_task(pool: &PgPool, date: NaiveDate) -> Result<DailyTask> {
    sqlx::query(
        "INSERT INTO daily_tasks (task_date, phase) VALUES ($1, 'init') \
         ON CONFLICT (task_date) DO NOTHING",
    )
    .bind(date)
    .execute(pool)
    .await
    .context("failed to insert daily task")?;

    let task = sqlx::query_as::<_, DailyTask>("SELECT * FROM daily_tasks WHERE task_date = $1")
        .bind(date)
        .fetch_one(pool)
        .await
        .context("failed to fetch daily task after get-or-create")?;

    Ok(task)
}

/// Fetch a `DailyTask` row by date, without creating one.
pub async fn get_task(pool: &PgPool, date: NaiveDate) -> Result<Option<DailyTask>> {
    let task = sqlx::query_as::<_, DailyTask>("SELECT * FROM daily_tasks WHERE task_date = $1")
        .bind(date)
        .fetch_optional(pool)
        .await
        .context("failed to fetch daily task")?;

    Ok(task)
}

/// Error returned by [`advance_phase`] when the current phase does not
/// match the expected `from` value (a concurrent tick already advanced it).
#[derive(Debug, thiserror::Error)]
#[error("phase mismatch for task {date}: expected {from}, advancing to {to}")]
pub struct PhaseMismatch {
    pub date: NaiveDate,
    pub from: TaskPhase,
    pub to: TaskPhase,
}

/// Advance a task's phase, iff the current phase matches `from`.
///
/// Optimistic lock: the `UPDATE`'s `WHERE` clause includes `phase = $from`,
/// so a losing concurrent caller affects zero rows and gets
/// [`PhaseMismatch`] back rather than silently overwriting progress.
pub async fn advance_phase(
    pool: &PgPool,
    date: NaiveDate,
    from: TaskPhase,
    to: TaskPhase,
) -> Result<()> {
    let published_at = matches!(to, TaskPhase::Published).then(Utc::now);

    let result = sqlx::query(
        "UPDATE daily_tasks \
         SET phase = $1, updated_at = NOW(), \
             published_at = COALESCE($2, published_at) \
         WHERE task_date = $3 AND phase = $4",
    )
    .bind(to)
    .bind(published_at)
    .bind(date)
    .bind(from)
    .execute(pool)
    .await
    .context("failed to advance task phase")?;

    if result.rows_affected() == 0 {
        return Err(PhaseMismatch { date, from, to }.into());
    }

    Ok(())
}

/// Error returned by [`bulk_insert_articles`] when articles already exist
/// for the given date.
#[derive(Debug, thiserror::Error)]
#[error("articles already exist for task date {0}")]
pub struct DuplicateTask(pub NaiveDate);

/// Bulk-insert the day's candidate articles and set `total_articles`.
///
/// Fails with [`DuplicateTask`] if any article rows already exist for
/// `date`, per spec: `FetchList` only runs from a zero-article state.
pub async fn bulk_insert_articles(
    pool: &PgPool,
    date: NaiveDate,
    rows: &[NewArticle],
) -> Result<()> {
    let existing: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles WHERE task_date = $1")
        .bind(date)
        .fetch_one(pool)
        .await
        .context("failed to check for existing articles")?;

    if existing.0 > 0 {
        return Err(DuplicateTask(date).into());
    }

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    for row in rows {
        sqlx::query(
            "INSERT INTO articles \
             (task_date, story_id, rank, url, title_en, title_zh, score, published_time, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')",
        )
        .bind(date)
        .bind(row.story_id)
        .bind(row.rank)
        .bind(&row.url)
        .bind(&row.title_en)
        .bind(&row.title_zh)
        .bind(row.score)
        .bind(row.published_time)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to insert article story {}", row.story_id))?;
    }

    sqlx::query("UPDATE daily_tasks SET total_articles = $1, updated_at = NOW() WHERE task_date = $2")
        .bind(rows.len() as i32)
        .bind(date)
        .execute(&mut *tx)
        .await
        .context("failed to set total_articles")?;

    tx.commit().await.context("failed to commit article insert")?;

    Ok(())
}

/// Atomically claim up to `n` pending (or stuck-processing) articles for
/// `date`, transitioning them to `processing` and returning them.
///
/// The only concurrency-sensitive read in the store: two concurrent callers
/// cannot both claim the same row, since the inner `SELECT ... FOR UPDATE
/// SKIP LOCKED` combined with the outer `UPDATE` commits atomically.
/// A row already in `processing` is included in the candidate set if its
/// `updated_at` is older than `processing_timeout_secs` (stuck-row reclaim),
/// giving automatic recovery from aborted ticks without a separate reaper.
pub async fn claim_pending_batch(
    pool: &PgPool,
    date: NaiveDate,
    n: i32,
    processing_timeout_secs: i64,
) -> Result<Vec<Article>> {
    let claimed = sqlx::query_as::<_, Article>(
        "UPDATE articles \
         SET status = 'processing', updated_at = NOW() \
         WHERE id IN ( \
             SELECT id FROM articles \
             WHERE task_date = $1 \
               AND ( \
                   status = 'pending' \
                   OR (status = 'processing' AND updated_at < NOW() - ($2 || ' seconds')::interval) \
               ) \
             ORDER BY rank \
             LIMIT $3 \
             FOR UPDATE SKIP LOCKED \
         ) \
         RETURNING *",
    )
    .bind(date)
    .bind(processing_timeout_secs.to_string())
    .bind(n)
    .fetch_all(pool)
    .await
    .context("failed to claim pending batch")?;

    Ok(claimed)
}

/// Error returned by [`complete_articles`] when a row being completed is
/// not currently in `processing` status.
#[derive(Debug, thiserror::Error)]
#[error("status mismatch completing article {0}: row is not in processing")]
pub struct StatusMismatch(pub Uuid);

/// Write the outcomes of a processed batch back in one transaction,
/// incrementing the task's `completed_articles`/`failed_articles` counters
/// atomically with the per-article writes.
pub async fn complete_articles(
    pool: &PgPool,
    date: NaiveDate,
    outcomes: &[ArticleOutcome],
) -> Result<()> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let mut completed_delta = 0i32;
    let mut failed_delta = 0i32;

    for outcome in outcomes {
        let result = sqlx::query(
            "UPDATE articles \
             SET status = $1, title_zh = COALESCE($2, title_zh), \
                 content_summary_zh = $3, comment_summary_zh = $4, \
                 error_message = $5, updated_at = NOW() \
             WHERE id = $6 AND status = 'processing'",
        )
        .bind(outcome.status)
        .bind(&outcome.title_zh)
        .bind(&outcome.content_summary_zh)
        .bind(&outcome.comment_summary_zh)
        .bind(&outcome.error_message)
        .bind(outcome.id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to write outcome for article {}", outcome.id))?;

        if result.rows_affected() == 0 {
            return Err(StatusMismatch(outcome.id).into());
        }

        match outcome.status {
            ArticleStatus::Completed => completed_delta += 1,
            ArticleStatus::Failed => failed_delta += 1,
            _ => {}
        }
    }

    sqlx::query(
        "UPDATE daily_tasks \
         SET completed_articles = completed_articles + $1, \
             failed_articles = failed_articles + $2, \
             updated_at = NOW() \
         WHERE task_date = $3",
    )
    .bind(completed_delta)
    .bind(failed_delta)
    .bind(date)
    .execute(&mut *tx)
    .await
    .context("failed to update task counters")?;

    tx.commit().await.context("failed to commit article outcomes")?;

    Ok(())
}

/// Ordered list of `completed` Articles for a date, by `rank`.
pub async fn list_completed(pool: &PgPool, date: NaiveDate) -> Result<Vec<Article>> {
    let articles = sqlx::query_as::<_, Article>(
        "SELECT * FROM articles WHERE task_date = $1 AND status = 'completed' ORDER BY rank",
    )
    .bind(date)
    .fetch_all(pool)
    .await
    .context("failed to list completed articles")?;

    Ok(articles)
}

/// Append a batch observability record. Append-only, never mutated.
pub async fn record_batch(pool: &PgPool, rec: &BatchRecord) -> Result<()> {
    sqlx::query(
        "INSERT INTO task_batches \
         (task_date, batch_index, article_count, subrequest_count, duration_ms, status, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(rec.task_date)
    .bind(rec.batch_index)
    .bind(rec.article_count)
    .bind(rec.subrequest_count)
    .bind(rec.duration_ms)
    .bind(rec.status)
    .bind(&rec.error_message)
    .execute(pool)
    .await
    .context("failed to record batch")?;

    Ok(())
}

/// Count of batches already recorded for a date (used to number the next
/// `batch_index`).
pub async fn count_batches(pool: &PgPool, date: NaiveDate) -> Result<i32> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM task_batches WHERE task_date = $1")
        .bind(date)
        .fetch_one(pool)
        .await
        .context("failed to count batches")?;

    Ok(row.0 as i32)
}

/// Reset `failed` articles under `max_retries` back to `pending`,
/// incrementing `retry_count`. Rows already at `max_retries` are left
/// untouched (poison articles). Returns the number of rows re-queued.
///
/// If any rows were re-queued and the task had already reached
/// `Aggregating` or `Published` (i.e. every article had a terminal
/// status), the phase is reopened to `Processing` so the next Driver
/// tick's `ProcessBatch` claim picks the re-queued rows back up.
pub async fn retry_failed(pool: &PgPool, date: NaiveDate, max_retries: i32) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE articles \
         SET status = 'pending', retry_count = retry_count + 1, \
             error_message = NULL, updated_at = NOW() \
         WHERE task_date = $1 AND status = 'failed' AND retry_count < $2",
    )
    .bind(date)
    .bind(max_retries)
    .execute(pool)
    .await
    .context("failed to retry failed articles")?;

    let rows = result.rows_affected();

    if rows > 0 {
        sqlx::query(
            "UPDATE daily_tasks \
             SET failed_articles = failed_articles - $1, updated_at = NOW() \
             WHERE task_date = $2",
        )
        .bind(rows as i32)
        .bind(date)
        .execute(pool)
        .await
        .context("failed to adjust failed_articles after retry")?;

        sqlx::query(
            "UPDATE daily_tasks \
             SET phase = 'processing', updated_at = NOW() \
             WHERE task_date = $1 AND phase IN ('aggregating', 'published')",
        )
        .bind(date)
        .execute(pool)
        .await
        .context("failed to reopen phase after retry")?;
    }

    Ok(rows)
}

/// Mark a task published: phase -> `Published`, `published_at` = now.
pub async fn mark_published(pool: &PgPool, date: NaiveDate) -> Result<()> {
    sqlx::query(
        "UPDATE daily_tasks \
         SET phase = 'published', published_at = NOW(), updated_at = NOW() \
         WHERE task_date = $1",
    )
    .bind(date)
    .execute(pool)
    .await
    .context("failed to mark task published")?;

    Ok(())
}

/// If the task at `date` is `Published`, archive it. Returns `true` if the
/// task was archived, `false` if it was in some other phase (no-op).
pub async fn archive_if_published(pool: &PgPool, date: NaiveDate) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE daily_tasks SET phase = 'archived', updated_at = NOW() \
         WHERE task_date = $1 AND phase = 'published'",
    )
    .bind(date)
    .execute(pool)
    .await
    .context("failed to archive task")?;

    Ok(result.rows_affected() > 0)
}

/// Archive every `Published` task whose date is strictly before `today`.
///
/// This is the day-rollover step the Driver runs at the top of every tick,
/// ahead of `get_or_create_task(today)`: a task that reached `Published`
/// on a prior day is swept into `Archived` before today's task is touched,
/// so `find_stale_task` only ever reports genuinely incomplete carryover.
/// Returns the dates archived.
pub async fn archive_stale_published(pool: &PgPool, today: NaiveDate) -> Result<Vec<NaiveDate>> {
    let rows: Vec<(NaiveDate,)> = sqlx::query_as(
        "UPDATE daily_tasks SET phase = 'archived', updated_at = NOW() \
         WHERE task_date < $1 AND phase = 'published' \
         RETURNING task_date",
    )
    .bind(today)
    .fetch_all(pool)
    .await
    .context("failed to archive stale published tasks")?;

    Ok(rows.into_iter().map(|(d,)| d).collect())
}

/// Find the most recent task date whose phase is not `Published` or
/// `Archived` and which is strictly before `today` — a stale task left
/// over from a previous day's rollover.
pub async fn find_stale_task(pool: &PgPool, today: NaiveDate) -> Result<Option<DailyTask>> {
    let task = sqlx::query_as::<_, DailyTask>(
        "SELECT * FROM daily_tasks \
         WHERE task_date < $1 AND phase NOT IN ('published', 'archived') \
         ORDER BY task_date DESC \
         LIMIT 1",
    )
    .bind(today)
    .fetch_optional(pool)
    .await
    .context("failed to find stale task")?;

    Ok(task)
}

/// Read-only progress snapshot: the task row plus per-status article counts.
pub async fn get_progress(pool: &PgPool, date: NaiveDate) -> Result<Option<TaskProgress>> {
    let Some(task) = get_task(pool, date).await? else {
        return Ok(None);
    };

    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status::text, COUNT(*) as cnt FROM articles WHERE task_date = $1 GROUP BY status",
    )
    .bind(date)
    .fetch_all(pool)
    .await
    .context("failed to get article status counts")?;

    let mut counts = ArticleStatusCounts::default();
    for (status, count) in rows {
        match status.as_str() {
            "pending" => counts.pending = count,
            "processing" => counts.processing = count,
            "completed" => counts.completed = count,
            "failed" => counts.failed = count,
            _ => {}
        }
    }

    Ok(Some(TaskProgress { task, counts }))
}

/// Count `completed` articles for a date (used by `force-publish`'s
/// precondition: at least one completed article must exist).
pub async fn count_completed(pool: &PgPool, date: NaiveDate) -> Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM articles WHERE task_date = $1 AND status = 'completed'",
    )
    .bind(date)
    .fetch_one(pool)
    .await
    .context("failed to count completed articles")?;

    Ok(row.0)
}

/// Most recent batch records for a date, newest first.
pub async fn recent_batches(pool: &PgPool, date: NaiveDate, limit: i64) -> Result<Vec<BatchRecord>> {
    let batches = sqlx::query_as::<_, BatchRecord>(
        "SELECT * FROM task_batches WHERE task_date = $1 ORDER BY batch_index DESC LIMIT $2",
    )
    .bind(date)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to fetch recent batches")?;

    Ok(batches)
}
