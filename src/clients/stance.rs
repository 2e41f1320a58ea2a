//! Client for the external stance classifier.
//!
//! The classifier is prompted to return exactly one of support/oppose/neutral
//! but routinely returns prose around the label, or garbage. This boundary is
//! infallible: transport errors and unrecognizable payloads surface as
//! [`ClassifierOutcome::Fallback`], never as errors.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::{debug, warn};

use crate::pipeline::stance::{ClassifierOutcome, StanceClassifier};
use crate::pipeline::types::Stance;
use crate::util::error::is_fatal;
use crate::util::json::{extract_json_object, non_empty_str};
use crate::util::retry::{RetryConfig, retry_async};

#[derive(Debug, Clone)]
pub struct StanceClassifierClient {
    client: Client,
    base_url: Url,
    retry: RetryConfig,
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

impl StanceClassifierClient {
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        total_timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(total_timeout)
            .build()
            .context("failed to build stance-classifier client")?;
        let base_url =
            Url::parse(&base_url.into()).context("invalid stance-classifier base URL")?;
        Ok(Self {
            client,
            base_url,
            retry,
        })
    }

    pub async fn health_check(&self) -> Result<()> {
        let url = self
            .base_url
            .join("health")
            .context("failed to build stance-classifier health URL")?;
        self.client
            .get(url)
            .send()
            .await
            .context("stance-classifier health request failed")?
            .error_for_status()
            .context("stance-classifier health endpoint returned error status")?;
        Ok(())
    }

    async fn request_label(&self, text: &str) -> Result<String> {
        let url = self
            .base_url
            .join("v1/classify")
            .context("failed to build classify URL")?;
        retry_async(&self.retry, || async {
            self.client
                .post(url.clone())
                .json(&ClassifyRequest { text })
                .send()
                .await
                .context("classify request failed")?
                .error_for_status()
                .context("classify endpoint returned error status")?
                .text()
                .await
                .context("failed to read classify response body")
        })
        .await
    }

    /// Pull a stance out of whatever the classifier returned: a JSON
    /// `{"stance": ...}` payload, or a bare label somewhere in the body.
    /// A body with no recognizable label at all yields `None` so the caller
    /// can count the fallback.
    fn parse_label(body: &str) -> Option<Stance> {
        let label = extract_json_object(body)
            .as_ref()
            .and_then(|value| non_empty_str(value, "stance").map(ToString::to_string))
            .unwrap_or_else(|| body.to_string());

        let normalized = label.to_lowercase();
        let recognized = ["support", "oppose", "neutral"]
            .iter()
            .any(|token| normalized.contains(token));
        recognized.then(|| Stance::parse(&normalized))
    }
}

#[async_trait]
impl StanceClassifier for StanceClassifierClient {
    async fn classify(&self, text: &str) -> ClassifierOutcome {
        let body = match self.request_label(text).await {
            Ok(body) => body,
            Err(error) => {
                if is_fatal(&error) {
                    warn!(
                        error = %format!("{error:#}"),
                        "classifier rejected request, check credentials and base URL"
                    );
                } else {
                    debug!(error = %format!("{error:#}"), "classifier transport failure");
                }
                return ClassifierOutcome::Fallback(format!("transport: {error:#}"));
            }
        };

        match Self::parse_label(&body) {
            Some(stance) => ClassifierOutcome::Parsed(stance),
            None => ClassifierOutcome::Fallback("unrecognized label".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, retries: usize) -> StanceClassifierClient {
        StanceClassifierClient::new(
            server.uri(),
            Duration::from_secs(1),
            Duration::from_secs(2),
            RetryConfig::new(retries, 1, 1),
        )
        .unwrap()
    }

    #[test]
    fn parse_label_handles_json_prose_and_garbage() {
        assert_eq!(
            StanceClassifierClient::parse_label(r#"{"stance": "oppose"}"#),
            Some(Stance::Oppose)
        );
        assert_eq!(
            StanceClassifierClient::parse_label("The stance is: SUPPORT."),
            Some(Stance::Support)
        );
        assert_eq!(
            StanceClassifierClient::parse_label("neutral"),
            Some(Stance::Neutral)
        );
        assert_eq!(StanceClassifierClient::parse_label("no idea"), None);
    }

    #[tokio::test]
    async fn classifies_well_formed_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/classify"))
            .and(body_json_string(r#"{"text":"I back this plan"}"#))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"stance": "support"})),
            )
            .mount(&server)
            .await;

        let outcome = client(&server, 1).classify("I back this plan").await;
        assert_eq!(outcome, ClassifierOutcome::Parsed(Stance::Support));
    }

    #[tokio::test]
    async fn malformed_response_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/classify"))
            .respond_with(ResponseTemplate::new(200).set_body_string("I cannot decide"))
            .mount(&server)
            .await;

        let outcome = client(&server, 1).classify("anything").await;
        assert!(matches!(outcome, ClassifierOutcome::Fallback(_)));
        assert_eq!(outcome.stance(), Stance::Neutral);
    }

    #[tokio::test]
    async fn server_error_falls_back_instead_of_failing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/classify"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let outcome = client(&server, 1).classify("anything").await;
        assert!(matches!(outcome, ClassifierOutcome::Fallback(_)));
    }

    #[tokio::test]
    async fn auth_failure_falls_back_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/classify"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server, 3).classify("anything").await;
        assert!(matches!(outcome, ClassifierOutcome::Fallback(_)));
        assert_eq!(outcome.stance(), Stance::Neutral);
    }

    #[tokio::test]
    async fn transient_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/classify"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/classify"))
            .respond_with(ResponseTemplate::new(200).set_body_string("oppose"))
            .mount(&server)
            .await;

        let outcome = client(&server, 3).classify("anything").await;
        assert_eq!(outcome, ClassifierOutcome::Parsed(Stance::Oppose));
    }
}
