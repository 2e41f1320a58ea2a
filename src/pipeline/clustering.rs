//! Greedy similarity-threshold clustering over a bounded candidate set.
//!
//! The pass is deliberately order-sensitive: the candidate list arrives
//! ordered by recency/engagement and the head of the unclustered pool always
//! becomes the next seed. Reordering the input changes which items seed
//! clusters and therefore changes the output; that ordering is part of the
//! contract, not an accident to be normalized away.

use std::collections::VecDeque;

use tracing::warn;

use super::types::{ContentItem, TopicCluster};

/// Tunables for one clustering pass.
#[derive(Debug, Clone, Copy)]
pub struct ClusteringParams {
    /// Cosine similarity threshold for joining a seed's cluster.
    pub similarity_threshold: f32,
    /// Minimum cluster size; smaller attempts are discarded.
    pub min_posts_per_topic: usize,
    /// Maximum number of clusters emitted per pass.
    pub max_clusters: usize,
    /// Defensive cap on the candidate list; the pass is O(n²).
    pub max_candidates: usize,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.70,
            min_posts_per_topic: 3,
            max_clusters: 20,
            max_candidates: 1000,
        }
    }
}

/// Result of one clustering pass, with counters for telemetry.
#[derive(Debug)]
pub struct ClusteringOutcome {
    pub clusters: Vec<TopicCluster>,
    pub skipped_malformed: usize,
    pub discarded_small: usize,
}

/// Cosine similarity `dot(a,b) / (‖a‖·‖b‖)`, with a zero-norm guard.
///
/// Mismatched dimensions or a zero-length vector yield 0.0, never a division
/// by zero.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Run one greedy single-pass clustering over the candidates.
///
/// The head of the pool seeds a cluster; every remaining item whose cosine
/// similarity to the seed meets the threshold joins it and leaves the pool.
/// Attempts smaller than `min_posts_per_topic` are discarded *without*
/// returning their members to the pool: sparse regions are dropped, not
/// retried. Malformed items (empty embedding or dimension mismatch against
/// the first valid item) are skipped with a warning instead of aborting the
/// run.
#[must_use]
pub fn cluster_candidates(
    params: &ClusteringParams,
    candidates: Vec<ContentItem>,
) -> ClusteringOutcome {
    let mut candidates = candidates;
    if candidates.len() > params.max_candidates {
        warn!(
            count = candidates.len(),
            cap = params.max_candidates,
            "candidate list exceeds cap, truncating"
        );
        candidates.truncate(params.max_candidates);
    }

    let expected_dim = candidates
        .iter()
        .map(|item| item.embedding.len())
        .find(|len| *len > 0);

    let mut skipped_malformed = 0_usize;
    let mut pool: VecDeque<ContentItem> = VecDeque::with_capacity(candidates.len());
    for item in candidates {
        match expected_dim {
            Some(dim) if item.embedding.len() == dim => pool.push_back(item),
            _ => {
                warn!(
                    item_id = %item.id,
                    dimension = item.embedding.len(),
                    "skipping item with malformed embedding"
                );
                skipped_malformed += 1;
            }
        }
    }

    let mut clusters = Vec::new();
    let mut discarded_small = 0_usize;

    while pool.len() >= params.min_posts_per_topic && clusters.len() < params.max_clusters {
        let Some(seed) = pool.pop_front() else {
            break;
        };
        let seed_embedding = seed.embedding.clone();
        let mut members = vec![seed];
        let mut rest: VecDeque<ContentItem> = VecDeque::with_capacity(pool.len());

        for item in pool.drain(..) {
            if cosine_similarity(&seed_embedding, &item.embedding) >= params.similarity_threshold {
                members.push(item);
            } else {
                rest.push_back(item);
            }
        }
        pool = rest;

        if members.len() >= params.min_posts_per_topic {
            clusters.push(TopicCluster::from_members(members));
        } else {
            // Intentionally not returned to the pool.
            discarded_small += 1;
        }
    }

    ClusteringOutcome {
        clusters,
        skipped_malformed,
        discarded_small,
    }
}
