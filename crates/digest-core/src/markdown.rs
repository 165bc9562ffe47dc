//! Default renderer for the published artifact, implementing the artifact
//! contract: YAML front matter, `YYYY-MM-DD-daily.md` filename convention
//! (the date the digest is FOR, one day before the task run date),
//! rank-ordered article blocks, `failed` articles omitted.

use chrono::NaiveDate;

use digest_db::models::Article;

/// Render the Markdown document for a list of completed articles.
///
/// `digest_date` is the date the digest is FOR (one day before the task's
/// `task_date`, per the artifact contract). `articles` MUST already be
/// filtered to `completed` and ordered by `rank` -- this function performs
/// no filtering of its own.
pub fn render_digest(digest_date: NaiveDate, articles: &[Article]) -> String {
    let mut out = String::new();

    out.push_str("---\n");
    out.push_str("layout: daily\n");
    out.push_str(&format!("title: \"Daily Digest {digest_date}\"\n"));
    out.push_str(&format!("date: {digest_date}\n"));
    out.push_str("---\n\n");

    for article in articles {
        out.push_str(&format!("## {}. {}\n\n", article.rank, article.title_en));
        if let Some(title_zh) = &article.title_zh {
            out.push_str(&format!("**{title_zh}**\n\n"));
        }
        out.push_str(&format!(
            "- Published: {}\n",
            article.published_time.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out.push_str(&format!("- Link: {}\n\n", article.url));
        if let Some(summary) = &article.content_summary_zh {
            out.push_str(&format!("{summary}\n\n"));
        }
        if let Some(comments) = &article.comment_summary_zh {
            out.push_str(&format!("**评论摘要**: {comments}\n\n"));
        }
    }

    out
}

/// The digest's filename: `YYYY-MM-DD-daily.md` for the given digest date.
pub fn digest_filename(digest_date: NaiveDate) -> String {
    format!("{digest_date}-daily.md")
}

/// The date the digest covers, derived from the task run date (one day
/// prior, since `FetchList` ingests the previous UTC calendar day).
pub fn digest_date_for_task(task_date: NaiveDate) -> NaiveDate {
    task_date.pred_opt().unwrap_or(task_date)
}
