//! HTTP [`ArticleFetcher`] adapter against a configurable headless-browser
//! rendering endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::trait_def::{ArticleFetcher, ARTICLE_FETCH_TIMEOUT};
use super::types::FetchedArticle;

/// Calls a headless-browser service that renders `url` and returns the
/// extracted main content plus a short description.
pub struct HttpArticleFetcher {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct FetchRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    content: String,
    description: String,
}

impl HttpArticleFetcher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ArticleFetcher for HttpArticleFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<FetchedArticle> {
        let response: FetchResponse = self
            .client
            .post(&self.endpoint)
            .timeout(ARTICLE_FETCH_TIMEOUT)
            .json(&FetchRequest { url })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(FetchedArticle {
            content: response.content,
            description: response.description,
        })
    }
}
