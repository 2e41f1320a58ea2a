//! Client for the similarity-search index used by navigation mode.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::navigation::SimilaritySearch;
use crate::util::retry::{RetryConfig, retry_async};

#[derive(Debug, Clone)]
pub struct SimilarityIndexClient {
    client: Client,
    base_url: Url,
    retry: RetryConfig,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    score_threshold: f32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: Uuid,
}

impl SimilarityIndexClient {
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
            .context("failed to build similarity-index client")?;
        let base_url =
            Url::parse(&base_url.into()).context("invalid similarity-index base URL")?;
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
            .context("failed to build similarity-index health URL")?;
        self.client
            .get(url)
            .send()
            .await
            .context("similarity-index health request failed")?
            .error_for_status()
            .context("similarity-index health endpoint returned error status")?;
        Ok(())
    }
}

#[async_trait]
impl SimilaritySearch for SimilarityIndexClient {
    async fn search_similar(
        &self,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<Uuid>> {
        let url = self
            .base_url
            .join("v1/search")
            .context("failed to build search URL")?;

        let response = retry_async(&self.retry, || async {
            self.client
                .post(url.clone())
                .json(&SearchRequest {
                    vector,
                    limit,
                    score_threshold,
                })
                .send()
                .await
                .context("similarity search request failed")?
                .error_for_status()
                .context("similarity search endpoint returned error status")?
                .json::<SearchResponse>()
                .await
                .context("failed to deserialize similarity search response")
        })
        .await?;

        Ok(response.results.into_iter().map(|hit| hit.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_ranked_ids() {
        let server = MockServer::start().await;
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": first, "score": 0.91},
                    {"id": second, "score": 0.74}
                ]
            })))
            .mount(&server)
            .await;

        let client = SimilarityIndexClient::new(
            server.uri(),
            Duration::from_secs(1),
            Duration::from_secs(2),
            RetryConfig::new(1, 1, 1),
        )
        .unwrap();
        let ids = client.search_similar(&[1.0, 0.0], 10, 0.65).await.unwrap();
        assert_eq!(ids, vec![first, second]);
    }
}
