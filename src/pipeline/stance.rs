//! Stance splitting: classify cluster members into support/oppose/neutral
//! and apply the dual-stance keep/drop policy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::observability::Metrics;

use super::types::{ContentItem, Stance, StanceVector, TopicCluster};

/// Outcome of one classifier call. Malformed or failed responses surface as
/// `Fallback` with a reason; they never surface as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierOutcome {
    Parsed(Stance),
    Fallback(String),
}

impl ClassifierOutcome {
    /// Effective stance: fallback collapses to neutral.
    #[must_use]
    pub fn stance(&self) -> Stance {
        match self {
            Self::Parsed(stance) => *stance,
            Self::Fallback(_) => Stance::Neutral,
        }
    }
}

/// External stance classifier. Implementations must be infallible at this
/// boundary: any transport or parse failure becomes
/// [`ClassifierOutcome::Fallback`].
#[async_trait]
pub trait StanceClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> ClassifierOutcome;
}

/// Splitter tunables.
#[derive(Debug, Clone, Copy)]
pub struct StanceSplitSettings {
    /// Classifier calls dispatched concurrently per batch.
    pub batch_size: usize,
    /// Pause between batches, to bound outbound load on the classifier.
    pub batch_pause: Duration,
    /// When true, a cluster failing the dual-stance test is demoted to a
    /// single-vector topic instead of being dropped.
    pub single_vector_fallback: bool,
}

impl Default for StanceSplitSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_pause: Duration::from_millis(200),
            single_vector_fallback: false,
        }
    }
}

/// Result of splitting one cluster.
#[derive(Debug)]
pub enum SplitOutcome {
    /// Genuine disagreement: at least one member on each side.
    Dual {
        support: StanceVector,
        oppose: StanceVector,
        neutral: Vec<ContentItem>,
    },
    /// One-sided cluster demoted to a single vector (fallback enabled).
    Single {
        vector: StanceVector,
        neutral: Vec<ContentItem>,
    },
    /// One-sided cluster under the strict-drop policy.
    Dropped,
}

pub struct StanceSplitter {
    classifier: Arc<dyn StanceClassifier>,
    settings: StanceSplitSettings,
    metrics: Arc<Metrics>,
}

impl StanceSplitter {
    #[must_use]
    pub fn new(
        classifier: Arc<dyn StanceClassifier>,
        settings: StanceSplitSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            classifier,
            settings,
            metrics,
        }
    }

    /// Classify every member of the cluster and apply the keep/drop policy.
    ///
    /// A dual-vector topic requires at least one support and one oppose
    /// member; percentages are computed against the total membership, neutral
    /// included.
    pub async fn split(&self, cluster: &TopicCluster) -> SplitOutcome {
        let labels = self.classify_members(&cluster.members).await;

        let total = cluster.members.len();
        let mut support = Vec::new();
        let mut oppose = Vec::new();
        let mut neutral = Vec::new();
        for (member, stance) in cluster.members.iter().zip(labels) {
            match stance {
                Stance::Support => support.push(member.clone()),
                Stance::Oppose => oppose.push(member.clone()),
                Stance::Neutral => neutral.push(member.clone()),
            }
        }

        debug!(
            support = support.len(),
            oppose = oppose.len(),
            neutral = neutral.len(),
            "stance split complete"
        );

        if !support.is_empty() && !oppose.is_empty() {
            return SplitOutcome::Dual {
                support: StanceVector::from_members(Stance::Support, support, total),
                oppose: StanceVector::from_members(Stance::Oppose, oppose, total),
                neutral,
            };
        }

        if !self.settings.single_vector_fallback {
            return SplitOutcome::Dropped;
        }

        // Demotion path: take whichever non-neutral side exists; an
        // all-neutral cluster keeps its full membership as one neutral vector.
        if !support.is_empty() {
            SplitOutcome::Single {
                vector: StanceVector::from_members(Stance::Support, support, total),
                neutral,
            }
        } else if !oppose.is_empty() {
            SplitOutcome::Single {
                vector: StanceVector::from_members(Stance::Oppose, oppose, total),
                neutral,
            }
        } else {
            SplitOutcome::Single {
                vector: StanceVector::from_members(Stance::Neutral, neutral, total),
                neutral: Vec::new(),
            }
        }
    }

    /// Classify members in concurrent batches with an inter-batch pause.
    ///
    /// Individual failures never abort a batch: each failing call resolves to
    /// neutral independently.
    async fn classify_members(&self, members: &[ContentItem]) -> Vec<Stance> {
        let batch_size = self.settings.batch_size.max(1);
        let mut labels = Vec::with_capacity(members.len());
        let chunk_count = members.len().div_ceil(batch_size);

        for (index, chunk) in members.chunks(batch_size).enumerate() {
            let calls = chunk
                .iter()
                .map(|member| self.classifier.classify(&member.content));
            for outcome in futures::future::join_all(calls).await {
                if let ClassifierOutcome::Fallback(reason) = &outcome {
                    debug!(reason = %reason, "classifier fallback, defaulting to neutral");
                    self.metrics.classifier_fallbacks.inc();
                }
                labels.push(outcome.stance());
            }
            if index + 1 < chunk_count && !self.settings.batch_pause.is_zero() {
                tokio::time::sleep(self.settings.batch_pause).await;
            }
        }
        labels
    }
}
