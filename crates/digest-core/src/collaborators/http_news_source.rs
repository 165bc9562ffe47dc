//! HTTP [`NewsSource`] adapter against a Firebase-style JSON news
//! aggregator API (top-story id list, per-id story record, per-story
//! comment ids/bodies).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::trait_def::NewsSource;
use super::types::CandidateStory;

/// An HTTP-backed [`NewsSource`].
///
/// `base_url` points at the aggregator's JSON API root, e.g.
/// `https://hacker-news.firebaseio.com/v0`.
pub struct HttpNewsSource {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct StoryRecord {
    id: i64,
    title: String,
    url: Option<String>,
    score: i32,
    time: i64,
    kids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
struct CommentRecord {
    text: Option<String>,
    deleted: Option<bool>,
    dead: Option<bool>,
}

impl HttpNewsSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn fetch_story(&self, id: i64) -> anyhow::Result<Option<StoryRecord>> {
        let url = format!("{}/item/{id}.json", self.base_url);
        let record = self
            .client
            .get(&url)
            .timeout(super::trait_def::ARTICLE_FETCH_TIMEOUT)
            .send()
            .await?
            .json::<Option<StoryRecord>>()
            .await?;
        Ok(record)
    }
}

#[async_trait]
impl NewsSource for HttpNewsSource {
    async fn fetch_stories(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<CandidateStory>> {
        let top_ids: Vec<i64> = self
            .client
            .get(format!("{}/topstories.json", self.base_url))
            .timeout(super::trait_def::ARTICLE_FETCH_TIMEOUT)
            .send()
            .await?
            .json()
            .await?;

        let mut stories = Vec::new();
        for id in top_ids {
            let Some(record) = self.fetch_story(id).await? else {
                continue;
            };
            let Some(published_time) = DateTime::<Utc>::from_timestamp(record.time, 0) else {
                continue;
            };
            if published_time < window_start || published_time > window_end {
                continue;
            }
            let Some(url) = record.url else { continue };

            stories.push(CandidateStory {
                story_id: record.id,
                url,
                title_en: record.title,
                score: record.score,
                published_time,
            });
        }

        stories.sort_by(|a, b| b.score.cmp(&a.score));
        stories.truncate(limit);
        Ok(stories)
    }

    async fn fetch_comments(&self, story_id: i64) -> anyhow::Result<Vec<String>> {
        let Some(story) = self.fetch_story(story_id).await? else {
            return Ok(Vec::new());
        };
        let Some(kids) = story.kids else {
            return Ok(Vec::new());
        };

        let mut comments = Vec::new();
        for kid in kids {
            let url = format!("{}/item/{kid}.json", self.base_url);
            let record = self
                .client
                .get(&url)
                .timeout(super::trait_def::ARTICLE_FETCH_TIMEOUT)
                .send()
                .await?
                .json::<Option<CommentRecord>>()
                .await?;
            if let Some(record) = record {
                if record.deleted.unwrap_or(false) || record.dead.unwrap_or(false) {
                    continue;
                }
                if let Some(text) = record.text {
                    comments.push(text);
                }
            }
        }
        Ok(comments)
    }
}
