//! The external collaborator contracts (`NewsSource`, `ArticleFetcher`,
//! `Translator`, `Summarizer`, `ContentFilter`, `Publisher`) and concrete
//! HTTP/git/webhook adapters.

pub mod git_publisher;
pub mod http_article_fetcher;
pub mod http_llm;
pub mod http_news_source;
pub mod publisher_set;
pub mod trait_def;
pub mod types;
pub mod webhook_publisher;

pub use git_publisher::GitRepoPublisher;
pub use http_article_fetcher::HttpArticleFetcher;
pub use http_llm::HttpLlmClient;
pub use http_news_source::HttpNewsSource;
pub use publisher_set::PublisherSet;
pub use trait_def::{ArticleFetcher, ContentFilter, NewsSource, NoopContentFilter, Publisher, Summarizer, Translator};
pub use types::{CandidateStory, FetchedArticle};
pub use webhook_publisher::WebhookPublisher;
