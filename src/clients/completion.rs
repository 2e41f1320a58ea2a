//! Client for the external text-completion service.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;

use crate::pipeline::summary::Completion;
use crate::util::retry::{RetryConfig, retry_async};

#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: Client,
    base_url: Url,
    completion_timeout: Duration,
    retry: RetryConfig,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
}

impl CompletionClient {
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        completion_timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .context("failed to build completion client")?;
        let base_url = Url::parse(&base_url.into()).context("invalid completion base URL")?;
        Ok(Self {
            client,
            base_url,
            completion_timeout,
            retry,
        })
    }

    pub async fn health_check(&self) -> Result<()> {
        let url = self
            .base_url
            .join("health")
            .context("failed to build completion health URL")?;
        self.client
            .get(url)
            .send()
            .await
            .context("completion health request failed")?
            .error_for_status()
            .context("completion health endpoint returned error status")?;
        Ok(())
    }
}

#[async_trait]
impl Completion for CompletionClient {
    /// Request a completion. The service sometimes wraps its output in a JSON
    /// `{"text": ...}` envelope and sometimes returns the raw string; both
    /// are accepted. Parsing the *content* stays with the caller.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let url = self
            .base_url
            .join("v1/completions")
            .context("failed to build completions URL")?;

        let body = retry_async(&self.retry, || async {
            self.client
                .post(url.clone())
                .json(&CompletionRequest { prompt, max_tokens })
                .timeout(self.completion_timeout)
                .send()
                .await
                .context("completion request failed")?
                .error_for_status()
                .context("completion endpoint returned error status")?
                .text()
                .await
                .context("failed to read completion response body")
        })
        .await?;

        if body.trim().is_empty() {
            return Err(anyhow!("completion service returned an empty body"));
        }

        // Unwrap a {"text": ...} envelope when present.
        if let Ok(value) = serde_json::from_str::<Value>(&body) {
            if let Some(text) = value.get("text").and_then(Value::as_str) {
                return Ok(text.to_string());
            }
        }
        Ok(body)
    }
}
