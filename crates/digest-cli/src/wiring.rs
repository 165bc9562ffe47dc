//! Builds a [`HandlerContext`] by wiring the concrete HTTP/git/webhook
//! collaborator adapters to a resolved [`DigestConfig`]. Every `digestd`
//! command that drives the Driver or Control API goes through this one
//! constructor so there is a single place that assembles collaborators --
//! no process-global mutable state, per the core's constructor-injection
//! convention.

use std::sync::Arc;

use sqlx::PgPool;

use digest_core::budget::BudgetGuard;
use digest_core::collaborators::{
    GitRepoPublisher, HttpArticleFetcher, HttpLlmClient, HttpNewsSource, NoopContentFilter,
    Publisher, PublisherSet, WebhookPublisher,
};
use digest_core::handlers::HandlerContext;

use crate::config::DigestConfig;

pub fn build_context(pool: PgPool, config: &DigestConfig) -> HandlerContext {
    let collab = &config.collaborators;

    let llm = Arc::new(HttpLlmClient::new(
        collab.llm_endpoint.clone(),
        collab.llm_api_key.clone(),
        collab.llm_model.clone(),
    ));

    let mut publishers = PublisherSet::new();
    if let Some(repo_path) = &collab.git_repo_path {
        let content_dir = collab.git_content_dir.clone().unwrap_or_else(|| "_posts".to_owned());
        let author = collab.git_commit_author.clone().unwrap_or_else(|| "digestd".to_owned());
        publishers.add(Arc::new(GitRepoPublisher::new(repo_path.clone(), content_dir, author)) as Arc<dyn Publisher>);
    }
    if let Some(webhook_url) = &collab.webhook_url {
        publishers.add(Arc::new(WebhookPublisher::new(webhook_url.clone(), "webhook")) as Arc<dyn Publisher>);
    }

    HandlerContext {
        pool,
        news_source: Arc::new(HttpNewsSource::new(collab.news_source_base_url.clone())),
        article_fetcher: Arc::new(HttpArticleFetcher::new(collab.article_fetcher_endpoint.clone())),
        translator: llm.clone(),
        summarizer: llm,
        content_filter: Arc::new(NoopContentFilter),
        publishers,
        budget: BudgetGuard::new(config.budget_config()),
        config: config.handler_config(),
    }
}
