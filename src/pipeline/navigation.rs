//! Reversible per-consumer navigation mode.
//!
//! Entering a topic snapshots the consumer's current feed and swaps the view
//! to items similar to the topic centroid; exiting restores the snapshot
//! exactly. State is scoped per consumer and never shared.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::observability::Metrics;

use super::clustering::cosine_similarity;
use super::orchestrator::CandidateSource;
use super::types::{ContentItem, GeoFilter, Topic};

/// External similarity-search index, used to build a topic-filtered view
/// beyond the original candidate set.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    async fn search_similar(
        &self,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<Uuid>>;
}

/// Per-consumer navigation state while a topic filter is active.
#[derive(Debug, Clone)]
struct NavigationState {
    active_topic_id: Uuid,
    topic_centroid: Vec<f32>,
    filtered_item_ids: Vec<Uuid>,
    fallback_feed: Vec<ContentItem>,
}

#[derive(Debug, Clone, Copy)]
pub struct NavigationSettings {
    /// Similarity threshold for the filtered view; slightly lower than the
    /// clustering threshold so the view is wider than the seed cluster.
    pub score_threshold: f32,
    /// Items fetched per filter query.
    pub filter_limit: usize,
    /// Feed size when a lost snapshot has to be regenerated.
    pub default_feed_limit: usize,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            score_threshold: 0.65,
            filter_limit: 50,
            default_feed_limit: 50,
        }
    }
}

/// The view a consumer holds after an enter or exit transition.
#[derive(Debug)]
pub enum NavigationView {
    Filtered {
        active_topic_id: Uuid,
        item_ids: Vec<Uuid>,
    },
    Feed(Vec<ContentItem>),
}

pub struct NavigationManager {
    index: Arc<dyn SimilaritySearch>,
    feed_source: Arc<dyn CandidateSource>,
    settings: NavigationSettings,
    metrics: Arc<Metrics>,
    states: RwLock<FxHashMap<Uuid, NavigationState>>,
}

impl NavigationManager {
    #[must_use]
    pub fn new(
        index: Arc<dyn SimilaritySearch>,
        feed_source: Arc<dyn CandidateSource>,
        settings: NavigationSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            index,
            feed_source,
            settings,
            metrics,
            states: RwLock::new(FxHashMap::default()),
        }
    }

    /// Enter topic-filtered mode for one consumer.
    ///
    /// Snapshots `current_feed` for later restoration and computes the
    /// filtered view from the similarity index. If the index is unavailable
    /// the view falls back to filtering the snapshot locally by cosine
    /// similarity, so entering never fails on an index outage. A second
    /// enter replaces the previous state (and its snapshot).
    pub async fn enter(
        &self,
        consumer_id: Uuid,
        topic: &Topic,
        current_feed: Vec<ContentItem>,
    ) -> NavigationView {
        let filtered_item_ids = match self
            .index
            .search_similar(
                &topic.centroid,
                self.settings.filter_limit,
                self.settings.score_threshold,
            )
            .await
        {
            Ok(ids) => ids,
            Err(error) => {
                warn!(
                    consumer_id = %consumer_id,
                    error = %format!("{error:#}"),
                    "similarity index unavailable, filtering snapshot locally"
                );
                current_feed
                    .iter()
                    .filter(|item| {
                        cosine_similarity(&topic.centroid, &item.embedding)
                            >= self.settings.score_threshold
                    })
                    .map(|item| item.id)
                    .collect()
            }
        };

        info!(
            consumer_id = %consumer_id,
            topic_id = %topic.id,
            filtered = filtered_item_ids.len(),
            "entering topic navigation"
        );
        self.metrics.navigation_enters.inc();

        let state = NavigationState {
            active_topic_id: topic.id,
            topic_centroid: topic.centroid.clone(),
            filtered_item_ids: filtered_item_ids.clone(),
            fallback_feed: current_feed,
        };
        self.states.write().await.insert(consumer_id, state);

        NavigationView::Filtered {
            active_topic_id: topic.id,
            item_ids: filtered_item_ids,
        }
    }

    /// Exit topic-filtered mode, restoring the snapshot exactly.
    ///
    /// With no stored snapshot (e.g. after a process restart) a fresh default
    /// feed is regenerated instead of failing.
    pub async fn exit(&self, consumer_id: Uuid, geo: &GeoFilter) -> Result<NavigationView> {
        let state = self.states.write().await.remove(&consumer_id);
        self.metrics.navigation_exits.inc();

        match state {
            Some(state) => {
                info!(
                    consumer_id = %consumer_id,
                    topic_id = %state.active_topic_id,
                    "exiting topic navigation, restoring snapshot"
                );
                Ok(NavigationView::Feed(state.fallback_feed))
            }
            None => {
                warn!(
                    consumer_id = %consumer_id,
                    "no navigation snapshot, regenerating default feed"
                );
                self.metrics.navigation_exit_regenerated.inc();
                let feed = self
                    .feed_source
                    .default_feed(geo, self.settings.default_feed_limit)
                    .await?;
                Ok(NavigationView::Feed(feed))
            }
        }
    }

    /// Fetch the next page of the filtered view, against the topic centroid
    /// rather than the original candidate set. Returns only ids not already
    /// in the view; a consumer without an active topic gets an empty page.
    ///
    /// The state lock is never held across the index call, so one consumer's
    /// pagination cannot stall another consumer's transitions.
    pub async fn next_page(&self, consumer_id: Uuid, page_size: usize) -> Result<Vec<Uuid>> {
        let (topic_id, centroid, seen) = {
            let states = self.states.read().await;
            let Some(state) = states.get(&consumer_id) else {
                return Ok(Vec::new());
            };
            (
                state.active_topic_id,
                state.topic_centroid.clone(),
                state.filtered_item_ids.clone(),
            )
        };

        let ids = self
            .index
            .search_similar(
                &centroid,
                seen.len() + page_size,
                self.settings.score_threshold,
            )
            .await?;

        let fresh: Vec<Uuid> = ids
            .into_iter()
            .filter(|id| !seen.contains(id))
            .take(page_size)
            .collect();

        // The consumer may have exited or switched topics while the query
        // ran; stale results are discarded rather than merged.
        let mut states = self.states.write().await;
        let Some(state) = states.get_mut(&consumer_id) else {
            return Ok(Vec::new());
        };
        if state.active_topic_id != topic_id {
            return Ok(Vec::new());
        }
        let additions: Vec<Uuid> = fresh
            .into_iter()
            .filter(|id| !state.filtered_item_ids.contains(id))
            .collect();
        state.filtered_item_ids.extend(&additions);
        Ok(additions)
    }

    /// Active topic id for one consumer, if any.
    pub async fn active_topic(&self, consumer_id: Uuid) -> Option<Uuid> {
        self.states
            .read()
            .await
            .get(&consumer_id)
            .map(|state| state.active_topic_id)
    }
}
