//! Full discovery run: cache check, candidate fetch, clustering, stance
//! splitting, scoring, summarization, and topic assembly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::observability::Metrics;

use super::cache::{CacheKey, TopicCache};
use super::clustering::{ClusteringParams, cluster_candidates};
use super::scoring::{self, TrendingInputs, ViewerLocation, relevance_score, trending_score};
use super::stance::{SplitOutcome, StanceSplitter};
use super::summary::SummaryGenerator;
use super::types::{ContentItem, GeoFilter, GeographicScope, Stance, Topic, TopicCluster};

/// Upstream embedding source: content items with precomputed embeddings,
/// ordered by recency/engagement. That ordering feeds straight into the
/// order-sensitive clustering pass.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch_candidates(
        &self,
        window: Duration,
        geo: &GeoFilter,
    ) -> Result<Vec<ContentItem>>;

    /// Ranked default feed, used when a navigation snapshot has been lost.
    async fn default_feed(&self, geo: &GeoFilter, limit: usize) -> Result<Vec<ContentItem>>;
}

/// One discovery request: a scope plus its region filter.
#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub scope: GeographicScope,
    pub geo: GeoFilter,
    /// Viewer coordinates; when present the result cache buckets by rounded
    /// lat/lng so nearby callers share an entry.
    pub coordinates: Option<(f64, f64)>,
}

impl DiscoveryRequest {
    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        match self.coordinates {
            Some((lat, lng)) => CacheKey::from_coordinates(lat, lng),
            None => CacheKey::from_region(
                self.scope,
                self.geo.state.as_deref(),
                self.geo.city.as_deref(),
            ),
        }
    }
}

/// Engine-level tunables not owned by a single stage.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub clustering: ClusteringParams,
    /// Rolling window of content considered per run.
    pub candidate_window: Duration,
    /// Topic lifetime, also the cache TTL.
    pub topic_ttl: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            clustering: ClusteringParams::default(),
            candidate_window: Duration::from_secs(72 * 3600),
            topic_ttl: Duration::from_secs(900),
        }
    }
}

pub struct TopicOrchestrator {
    candidates: Arc<dyn CandidateSource>,
    splitter: StanceSplitter,
    summarizer: SummaryGenerator,
    cache: Arc<dyn TopicCache>,
    settings: EngineSettings,
    metrics: Arc<Metrics>,
}

impl TopicOrchestrator {
    #[must_use]
    pub fn new(
        candidates: Arc<dyn CandidateSource>,
        splitter: StanceSplitter,
        summarizer: SummaryGenerator,
        cache: Arc<dyn TopicCache>,
        settings: EngineSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            candidates,
            splitter,
            summarizer,
            cache,
            settings,
            metrics,
        }
    }

    /// Run one discovery pass for a region, serving from cache when fresh.
    ///
    /// Fewer candidates than the minimum cluster size yields an empty topic
    /// list, not an error. A cache backend failure degrades to a miss.
    pub async fn discover_topics(&self, request: &DiscoveryRequest) -> Result<Vec<Topic>> {
        let started = Instant::now();
        let key = request.cache_key();

        match self.cache.get(&key).await {
            Ok(Some(topics)) => {
                self.metrics.cache_hits.inc();
                info!(
                    key = key.as_str(),
                    count = topics.len(),
                    "serving cached topics"
                );
                return Ok(topics);
            }
            Ok(None) => self.metrics.cache_misses.inc(),
            Err(error) => {
                self.metrics.cache_misses.inc();
                warn!(
                    key = key.as_str(),
                    error = %format!("{error:#}"),
                    "cache backend unavailable, computing fresh results"
                );
            }
        }

        let candidates = self
            .candidates
            .fetch_candidates(self.settings.candidate_window, &request.geo)
            .await
            .context("failed to fetch candidate items")?;
        self.metrics
            .candidates_fetched
            .inc_by(candidates.len() as f64);

        if candidates.len() < self.settings.clustering.min_posts_per_topic {
            info!(
                count = candidates.len(),
                minimum = self.settings.clustering.min_posts_per_topic,
                "not enough candidates for a topic run"
            );
            return Ok(Vec::new());
        }

        let clustering_started = Instant::now();
        let outcome = cluster_candidates(&self.settings.clustering, candidates);
        self.metrics
            .clustering_duration
            .observe(clustering_started.elapsed().as_secs_f64());
        self.metrics
            .clusters_formed
            .inc_by(outcome.clusters.len() as f64);
        self.metrics
            .items_skipped_malformed
            .inc_by(outcome.skipped_malformed as f64);
        self.metrics
            .clusters_discarded_small
            .inc_by(outcome.discarded_small as f64);

        let mut topics = Vec::with_capacity(outcome.clusters.len());
        for cluster in &outcome.clusters {
            if let Some(topic) = self.assemble_topic(request, cluster).await {
                topics.push(topic);
            }
        }

        topics.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        self.metrics.topics_emitted.inc_by(topics.len() as f64);

        if let Err(error) = self.cache.set(&key, topics.clone()).await {
            warn!(
                key = key.as_str(),
                error = %format!("{error:#}"),
                "failed to store topics in cache"
            );
        }

        self.metrics
            .discovery_duration
            .observe(started.elapsed().as_secs_f64());
        info!(
            key = key.as_str(),
            clusters = outcome.clusters.len(),
            topics = topics.len(),
            "discovery run complete"
        );
        Ok(topics)
    }

    /// Split, score, and summarize one cluster. `None` means the cluster was
    /// dropped by the stance policy.
    async fn assemble_topic(
        &self,
        request: &DiscoveryRequest,
        cluster: &TopicCluster,
    ) -> Option<Topic> {
        let stance_started = Instant::now();
        let split = self.splitter.split(cluster).await;
        self.metrics
            .stance_duration
            .observe(stance_started.elapsed().as_secs_f64());

        let (support, oppose, neutral_members) = match split {
            SplitOutcome::Dual {
                support,
                oppose,
                neutral,
            } => (Some(support), Some(oppose), neutral),
            SplitOutcome::Single { vector, neutral } => {
                self.metrics.topics_single_vector.inc();
                match vector.stance {
                    Stance::Support => (Some(vector), None, neutral),
                    Stance::Oppose => (None, Some(vector), neutral),
                    Stance::Neutral => (None, None, vector.members),
                }
            }
            SplitOutcome::Dropped => {
                self.metrics.clusters_dropped_stance.inc();
                return None;
            }
        };

        // Controversy derived locally from stance balance; one-sided topics
        // score 0 and take no trending boost.
        let controversy = scoring::stance_balance_controversy(
            support.as_ref().map_or(0, |side| side.members.len()),
            oppose.as_ref().map_or(0, |side| side.members.len()),
        );

        let now = Utc::now();
        let viewer = ViewerLocation {
            state: request.geo.state.clone(),
            city: request.geo.city.clone(),
        };
        let members = &cluster.members;

        let relevance = relevance_score(members, request.scope, &viewer, now);
        let unique_participants = members
            .iter()
            .map(|member| member.author_id)
            .collect::<std::collections::HashSet<_>>()
            .len();
        let last_activity = members.iter().map(|member| member.created_at).max();
        let first_posted = members.iter().map(|member| member.created_at).min();
        let trending = trending_score(
            &TrendingInputs {
                post_count: members.len(),
                unique_participants,
                last_activity: last_activity.unwrap_or(now),
                created_at: first_posted.unwrap_or(now),
                controversy,
            },
            now,
        );
        let complexity = scoring::complexity_score(members);
        let evidence_quality = scoring::evidence_quality_score(members);

        let summary_started = Instant::now();
        let support_sample: &[ContentItem] =
            support.as_ref().map_or(&[], |side| side.members.as_slice());
        let oppose_sample: &[ContentItem] =
            oppose.as_ref().map_or(&[], |side| side.members.as_slice());
        let outcome = self
            .summarizer
            .generate(support_sample, oppose_sample)
            .await;
        self.metrics
            .summary_duration
            .observe(summary_started.elapsed().as_secs_f64());
        if outcome.is_fallback() {
            self.metrics.summary_fallbacks.inc();
        }
        let summary = outcome.into_summary();

        Some(Topic {
            id: Uuid::new_v4(),
            title: summary.title,
            summary: summary.summary,
            centroid: cluster.centroid.clone(),
            support,
            oppose,
            neutral_members,
            total_posts: members.len(),
            relevance_score: relevance,
            trending_score: trending,
            complexity_score: complexity,
            evidence_quality_score: evidence_quality,
            scope: request.scope,
            state: request.geo.state.clone(),
            city: request.geo.city.clone(),
            created_at: now,
            expires_at: now
                + chrono::Duration::from_std(self.settings.topic_ttl)
                    .unwrap_or_else(|_| chrono::Duration::minutes(15)),
        })
    }
}
