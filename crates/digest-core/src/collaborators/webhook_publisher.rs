//! A [`Publisher`] that posts the rendered digest to a chat-channel
//! webhook URL.

use async_trait::async_trait;
use serde::Serialize;

use super::trait_def::{Publisher, LLM_CALL_TIMEOUT};

/// Posts `{"text": markdown}` to a webhook URL. Idempotency is the
/// webhook receiver's responsibility; this adapter does not retry.
pub struct WebhookPublisher {
    client: reqwest::Client,
    webhook_url: String,
    label: String,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

impl WebhookPublisher {
    pub fn new(webhook_url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
            label: label.into(),
        }
    }
}

#[async_trait]
impl Publisher for WebhookPublisher {
    fn name(&self) -> &str {
        &self.label
    }

    async fn publish(&self, markdown: &str, _date: chrono::NaiveDate) -> anyhow::Result<()> {
        self.client
            .post(&self.webhook_url)
            .timeout(LLM_CALL_TIMEOUT)
            .json(&WebhookPayload { text: markdown })
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
