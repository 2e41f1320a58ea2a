//! Client for the embedding source: candidate items with precomputed
//! embeddings, plus the ranked default feed.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::pipeline::orchestrator::CandidateSource;
use crate::pipeline::types::{ContentItem, GeoFilter};
use crate::util::retry::{RetryConfig, retry_async};

#[derive(Debug, Clone)]
pub struct CandidateSourceClient {
    client: Client,
    base_url: Url,
    retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
struct CandidatesResponse {
    items: Vec<ContentItem>,
}

impl CandidateSourceClient {
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
            .context("failed to build embedding-source client")?;
        let base_url =
            Url::parse(&base_url.into()).context("invalid embedding-source base URL")?;
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
            .context("failed to build embedding-source health URL")?;
        self.client
            .get(url)
            .send()
            .await
            .context("embedding-source health request failed")?
            .error_for_status()
            .context("embedding-source health endpoint returned error status")?;
        Ok(())
    }

    fn geo_query(geo: &GeoFilter) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(state) = &geo.state {
            query.push(("state", state.clone()));
        }
        if let Some(city) = &geo.city {
            query.push(("city", city.clone()));
        }
        query
    }
}

#[async_trait]
impl CandidateSource for CandidateSourceClient {
    async fn fetch_candidates(
        &self,
        window: Duration,
        geo: &GeoFilter,
    ) -> Result<Vec<ContentItem>> {
        let url = self
            .base_url
            .join("v1/candidates")
            .context("failed to build candidates URL")?;
        let mut query = Self::geo_query(geo);
        query.push(("window_hours", (window.as_secs() / 3600).to_string()));

        let response = retry_async(&self.retry, || async {
            self.client
                .get(url.clone())
                .query(&query)
                .send()
                .await
                .context("candidates request failed")?
                .error_for_status()
                .context("candidates endpoint returned error status")?
                .json::<CandidatesResponse>()
                .await
                .context("failed to deserialize candidates response")
        })
        .await?;

        Ok(response.items)
    }

    async fn default_feed(&self, geo: &GeoFilter, limit: usize) -> Result<Vec<ContentItem>> {
        let url = self
            .base_url
            .join("v1/feed")
            .context("failed to build feed URL")?;
        let mut query = Self::geo_query(geo);
        query.push(("limit", limit.to_string()));

        let response = retry_async(&self.retry, || async {
            self.client
                .get(url.clone())
                .query(&query)
                .send()
                .await
                .context("feed request failed")?
                .error_for_status()
                .context("feed endpoint returned error status")?
                .json::<CandidatesResponse>()
                .await
                .context("failed to deserialize feed response")
        })
        .await?;

        Ok(response.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> CandidateSourceClient {
        CandidateSourceClient::new(
            server.uri(),
            Duration::from_secs(1),
            Duration::from_secs(2),
            RetryConfig::new(1, 1, 1),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_candidates_with_geo_query() {
        let server = MockServer::start().await;
        let item_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/v1/candidates"))
            .and(query_param("state", "CA"))
            .and(query_param("window_hours", "72"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": item_id,
                    "content": "post",
                    "embedding": [1.0, 0.0],
                    "author_id": Uuid::new_v4(),
                    "created_at": "2026-08-25T12:00:00Z",
                    "like_count": 2,
                    "state": "CA"
                }]
            })))
            .mount(&server)
            .await;

        let geo = GeoFilter {
            state: Some("CA".to_string()),
            city: None,
        };
        let items = client(&server)
            .fetch_candidates(Duration::from_secs(72 * 3600), &geo)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, item_id);
        assert_eq!(items[0].like_count, 2);
        assert_eq!(items[0].comment_count, 0);
    }

    #[tokio::test]
    async fn server_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/feed"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client(&server)
            .default_feed(&GeoFilter::default(), 10)
            .await;
        assert!(result.is_err());
    }
}
