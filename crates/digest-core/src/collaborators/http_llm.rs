//! HTTP [`Translator`]/[`Summarizer`] adapter against a configurable
//! chat-completion endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::trait_def::{Summarizer, Translator, LLM_CALL_TIMEOUT};

/// A chat-completion-style LLM client, used for both translation and
/// summarization. `endpoint` is the full completions URL;
/// `api_key` is sent as a bearer token.
pub struct HttpLlmClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl HttpLlmClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response: CompletionResponse = self
            .client
            .post(&self.endpoint)
            .timeout(LLM_CALL_TIMEOUT)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("LLM response contained no choices"))?;

        Ok(content)
    }
}

#[async_trait]
impl Translator for HttpLlmClient {
    async fn translate_titles(&self, titles: &[String]) -> anyhow::Result<Vec<String>> {
        let numbered: String = titles
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {t}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Translate each numbered English news title to Chinese. \
             Reply with exactly {} lines, one translation per line, no numbering:\n{numbered}",
            titles.len()
        );

        let content = self.complete(&prompt).await?;
        let translated: Vec<String> = content.lines().map(|l| l.trim().to_owned()).collect();

        if translated.len() != titles.len() {
            anyhow::bail!(
                "batch translate shape mismatch: expected {} lines, got {}",
                titles.len(),
                translated.len()
            );
        }

        Ok(translated)
    }
}

#[async_trait]
impl Summarizer for HttpLlmClient {
    async fn summarize_article(&self, text: &str) -> anyhow::Result<String> {
        let prompt = format!("Summarize the following article in Chinese, in 2-3 sentences:\n{text}");
        self.complete(&prompt).await
    }

    async fn summarize_comments(&self, texts: &[String]) -> anyhow::Result<String> {
        let joined = texts.join("\n---\n");
        let prompt =
            format!("Summarize the overall sentiment and key points of these comments in Chinese, in 2-3 sentences:\n{joined}");
        self.complete(&prompt).await
    }
}
