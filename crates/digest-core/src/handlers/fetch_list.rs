//! `FetchList`: pre: phase in {`Init`, `ListFetched` with zero articles}.
//!
//! Queries the news source for the previous UTC day's top stories, applies
//! the optional content filter, optionally pre-translates titles in one
//! batch call, bulk-inserts the articles, and advances the phase.

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use tracing::{info, warn};

use digest_db::models::{NewArticle, TaskPhase};
use digest_db::queries::tasks;

use crate::collaborators::CandidateStory;
use crate::state::TaskPhaseMachine;

use super::context::HandlerContext;

/// Run the `FetchList` handler for `date`. Budget: ~3 calls
/// (story list + batch translate + comment fetches are deferred to
/// `ProcessBatch`), well within the safe limit.
pub async fn run(ctx: &HandlerContext, date: NaiveDate) -> anyhow::Result<()> {
    ctx.budget.assert_within_budget(3)?;

    let current_phase = tasks::get_task(&ctx.pool, date)
        .await?
        .map(|t| t.phase)
        .unwrap_or(TaskPhase::Init);

    let window_end = date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc();
    let window_start = window_end - ChronoDuration::hours(ctx.config.hn_time_window_hours);

    let stories = ctx
        .news_source
        .fetch_stories(window_start, window_end, ctx.config.hn_story_limit)
        .await?;

    let filtered = ctx.content_filter.filter(stories);

    let titles: Vec<String> = filtered.iter().map(|s| s.title_en.clone()).collect();
    let translated_titles = if titles.is_empty() {
        Vec::new()
    } else {
        match ctx.translator.translate_titles(&titles).await {
            Ok(translated) if translated.len() == titles.len() => translated.into_iter().map(Some).collect(),
            Ok(_) | Err(_) => {
                warn!(task_date = %date, "batch title pre-translate failed or shape-mismatched; titles will be translated inline during processing");
                vec![None; titles.len()]
            }
        }
    };

    let rows = ranked_rows(filtered, translated_titles);

    if current_phase == TaskPhase::Init {
        if !rows.is_empty() {
            tasks::bulk_insert_articles(&ctx.pool, date, &rows).await?;
        }
        TaskPhaseMachine::transition(&ctx.pool, date, TaskPhase::Init, TaskPhase::ListFetched).await?;
    }

    if rows.is_empty() {
        // No candidate stories for the day: the termination condition in
        // ProcessBatch (empty claim) will never fire since nothing was
        // inserted, so transition straight to Aggregating here.
        TaskPhaseMachine::transition(&ctx.pool, date, TaskPhase::ListFetched, TaskPhase::Aggregating).await?;
        return Ok(());
    }

    info!(task_date = %date, article_count = rows.len(), "FetchList complete");
    Ok(())
}

fn ranked_rows(stories: Vec<CandidateStory>, titles_zh: Vec<Option<String>>) -> Vec<NewArticle> {
    let mut ranked: Vec<_> = stories.into_iter().zip(titles_zh).collect();
    ranked.sort_by(|a, b| b.0.score.cmp(&a.0.score));

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (story, title_zh))| NewArticle {
            story_id: story.story_id,
            rank: (i + 1) as i32,
            url: story.url,
            title_en: story.title_en,
            title_zh,
            score: story.score,
            published_time: story.published_time,
        })
        .collect()
}
