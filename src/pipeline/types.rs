//! Core data model for topic discovery runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single authored content item with its precomputed embedding.
///
/// Immutable once fetched for a run; the engine never mutates engagement
/// counters or geography mid-pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub content: String,
    pub embedding: Vec<f32>,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default)]
    pub share_count: u32,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

/// One topic cluster produced by a clustering pass.
///
/// Invariant: `members.len() >= min_posts_per_topic` for every emitted
/// cluster; membership is fixed at construction and the centroid is the
/// per-dimension arithmetic mean of the member embeddings.
#[derive(Debug, Clone)]
pub struct TopicCluster {
    pub centroid: Vec<f32>,
    pub members: Vec<ContentItem>,
}

impl TopicCluster {
    #[must_use]
    pub fn from_members(members: Vec<ContentItem>) -> Self {
        let centroid = mean_embedding(&members);
        Self { centroid, members }
    }
}

/// Per-dimension arithmetic mean of the item embeddings. Empty input yields
/// an empty vector.
#[must_use]
pub fn mean_embedding(items: &[ContentItem]) -> Vec<f32> {
    let Some(first) = items.first() else {
        return Vec::new();
    };
    let dim = first.embedding.len();
    let mut sums = vec![0.0_f32; dim];
    for item in items {
        for (slot, value) in sums.iter_mut().zip(item.embedding.iter()) {
            *slot += value;
        }
    }
    let count = items.len() as f32;
    for slot in &mut sums {
        *slot /= count;
    }
    sums
}

/// Stance of one content item relative to its cluster's topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Support,
    Oppose,
    Neutral,
}

impl Stance {
    /// Defensive parse of a classifier label. Never fails: anything that is
    /// not recognizably support or oppose collapses to [`Stance::Neutral`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        if normalized.contains("support") {
            Self::Support
        } else if normalized.contains("oppose") {
            Self::Oppose
        } else {
            Self::Neutral
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Oppose => "oppose",
            Self::Neutral => "neutral",
        }
    }
}

/// One side of a stance split: the mean vector and membership of every item
/// classified into that stance.
#[derive(Debug, Clone, Serialize)]
pub struct StanceVector {
    pub stance: Stance,
    pub vector: Vec<f32>,
    pub members: Vec<ContentItem>,
    /// Rounded share of the *total* cluster membership, neutral included in
    /// the denominator.
    pub percentage: u8,
}

impl StanceVector {
    #[must_use]
    pub fn from_members(stance: Stance, members: Vec<ContentItem>, total_members: usize) -> Self {
        let vector = mean_embedding(&members);
        let percentage = if total_members == 0 {
            0
        } else {
            (100.0 * members.len() as f64 / total_members as f64).round() as u8
        };
        Self {
            stance,
            vector,
            members,
            percentage,
        }
    }
}

/// Geographic scope of a discovery run and of the topics it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeographicScope {
    National,
    State,
    Local,
}

impl GeographicScope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::National => "national",
            Self::State => "state",
            Self::Local => "local",
        }
    }
}

/// Assembled output topic, ready for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct Topic {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    /// Cluster centroid, kept for navigation-mode similarity queries but not
    /// part of the serialized surface.
    #[serde(skip)]
    pub centroid: Vec<f32>,
    pub support: Option<StanceVector>,
    pub oppose: Option<StanceVector>,
    pub neutral_members: Vec<ContentItem>,
    pub total_posts: usize,
    pub relevance_score: f64,
    pub trending_score: f64,
    pub complexity_score: f64,
    pub evidence_quality_score: f64,
    pub scope: GeographicScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Geography filter applied when fetching candidates or regenerating a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoFilter {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(embedding: Vec<f32>) -> ContentItem {
        ContentItem {
            id: Uuid::new_v4(),
            content: "test".to_string(),
            embedding,
            author_id: Uuid::new_v4(),
            created_at: Utc::now(),
            like_count: 0,
            comment_count: 0,
            share_count: 0,
            state: None,
            city: None,
        }
    }

    #[test]
    fn mean_embedding_is_per_dimension_average() {
        let items = vec![item(vec![1.0, 0.0]), item(vec![0.0, 1.0])];
        assert_eq!(mean_embedding(&items), vec![0.5, 0.5]);
    }

    #[test]
    fn mean_embedding_of_empty_slice_is_empty() {
        assert!(mean_embedding(&[]).is_empty());
    }

    #[test]
    fn stance_parse_is_defensive() {
        assert_eq!(Stance::parse("support"), Stance::Support);
        assert_eq!(Stance::parse("  OPPOSE\n"), Stance::Oppose);
        assert_eq!(Stance::parse("the stance is: support."), Stance::Support);
        assert_eq!(Stance::parse("maybe?"), Stance::Neutral);
        assert_eq!(Stance::parse(""), Stance::Neutral);
    }

    #[test]
    fn stance_vector_percentage_uses_total_membership() {
        let members = vec![item(vec![1.0]), item(vec![1.0]), item(vec![1.0])];
        // 3 of 10 total members (7 elsewhere, e.g. neutral)
        let vector = StanceVector::from_members(Stance::Support, members, 10);
        assert_eq!(vector.percentage, 30);
    }
}
