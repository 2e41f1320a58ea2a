//! TTL-based memoization of topic result sets.
//!
//! Keyed per (scope, region) or per rounded coordinate bucket. Expiry is
//! checked lazily on read; there is no background sweep. Writes overwrite
//! unconditionally (last-writer-wins), and staleness inside the TTL window
//! is an accepted trade-off.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use super::types::{GeographicScope, Topic};

/// Cache key for one discovery result set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key from a (scope, state, city) region triple, e.g. `national__` or
    /// `local_CA_Oakland`.
    #[must_use]
    pub fn from_region(
        scope: GeographicScope,
        state: Option<&str>,
        city: Option<&str>,
    ) -> Self {
        Self(format!(
            "{}_{}_{}",
            scope.as_str(),
            state.unwrap_or(""),
            city.unwrap_or("")
        ))
    }

    /// Key from coordinates, rounded to one decimal place (~11 km) so nearby
    /// queries share a bucket.
    #[must_use]
    pub fn from_coordinates(lat: f64, lng: f64) -> Self {
        Self(format!("geo_{lat:.1}_{lng:.1}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Injectable result cache. Backend failures are surfaced as errors so the
/// caller can degrade to a miss; they must never fail a discovery run.
#[async_trait]
pub trait TopicCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<Topic>>>;
    async fn set(&self, key: &CacheKey, topics: Vec<Topic>) -> Result<()>;
}

struct CacheEntry {
    topics: Vec<Topic>,
    stored_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match (now - self.stored_at).to_std() {
            Ok(age) => age < ttl,
            // stored_at in the future (clock skew): treat as fresh
            Err(_) => true,
        }
    }
}

/// In-memory TTL cache, the default backend.
pub struct InMemoryTopicCache {
    ttl: Duration,
    entries: RwLock<FxHashMap<String, CacheEntry>>,
}

impl InMemoryTopicCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Read with an explicit clock, for TTL boundary tests.
    pub async fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Vec<Topic>> {
        let entries = self.entries.read().await;
        entries
            .get(key.as_str())
            .filter(|entry| entry.is_fresh(self.ttl, now))
            .map(|entry| entry.topics.clone())
    }

    /// Write with an explicit clock.
    pub async fn set_at(&self, key: &CacheKey, topics: Vec<Topic>, now: DateTime<Utc>) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.as_str().to_string(),
            CacheEntry {
                topics,
                stored_at: now,
            },
        );
    }
}

#[async_trait]
impl TopicCache for InMemoryTopicCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<Topic>>> {
        Ok(self.get_at(key, Utc::now()).await)
    }

    async fn set(&self, key: &CacheKey, topics: Vec<Topic>) -> Result<()> {
        self.set_at(key, topics, Utc::now()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    fn topic(title: &str) -> Topic {
        let now = Utc::now();
        Topic {
            id: Uuid::new_v4(),
            title: title.to_string(),
            summary: String::new(),
            centroid: vec![1.0],
            support: None,
            oppose: None,
            neutral_members: Vec::new(),
            total_posts: 3,
            relevance_score: 0.0,
            trending_score: 0.0,
            complexity_score: 0.0,
            evidence_quality_score: 0.0,
            scope: GeographicScope::National,
            state: None,
            city: None,
            created_at: now,
            expires_at: now,
        }
    }

    #[test]
    fn region_key_format_is_stable() {
        let key = CacheKey::from_region(GeographicScope::National, None, None);
        assert_eq!(key.as_str(), "national__");
        let key = CacheKey::from_region(GeographicScope::Local, Some("CA"), Some("Oakland"));
        assert_eq!(key.as_str(), "local_CA_Oakland");
    }

    #[test]
    fn coordinate_keys_bucket_nearby_queries() {
        let a = CacheKey::from_coordinates(37.804, -122.271);
        let b = CacheKey::from_coordinates(37.799, -122.302);
        let far = CacheKey::from_coordinates(34.052, -118.243);
        assert_eq!(a, b);
        assert_ne!(a, far);
    }

    #[tokio::test]
    async fn value_is_returned_inside_ttl_and_missed_after() {
        let cache = InMemoryTopicCache::new(Duration::from_secs(900));
        let key = CacheKey::from_region(GeographicScope::National, None, None);
        let stored_at = Utc::now();
        cache
            .set_at(&key, vec![topic("Transit")], stored_at)
            .await;

        let hit = cache
            .get_at(&key, stored_at + ChronoDuration::minutes(10))
            .await;
        assert_eq!(hit.unwrap()[0].title, "Transit");

        let miss = cache
            .get_at(&key, stored_at + ChronoDuration::minutes(16))
            .await;
        assert!(miss.is_none());

        // Boundary: exactly at TTL is a miss.
        let boundary = cache
            .get_at(&key, stored_at + ChronoDuration::minutes(15))
            .await;
        assert!(boundary.is_none());
    }

    #[tokio::test]
    async fn write_overwrites_unconditionally() {
        let cache = InMemoryTopicCache::new(Duration::from_secs(900));
        let key = CacheKey::from_region(GeographicScope::National, None, None);
        let now = Utc::now();
        cache.set_at(&key, vec![topic("Old")], now).await;
        cache.set_at(&key, vec![topic("New")], now).await;
        let value = cache.get_at(&key, now).await.unwrap();
        assert_eq!(value.len(), 1);
        assert_eq!(value[0].title, "New");
    }

    #[tokio::test]
    async fn distinct_regions_do_not_collide() {
        let cache = InMemoryTopicCache::new(Duration::from_secs(900));
        let now = Utc::now();
        let national = CacheKey::from_region(GeographicScope::National, None, None);
        let state = CacheKey::from_region(GeographicScope::State, Some("CA"), None);
        cache.set_at(&national, vec![topic("N")], now).await;
        cache.set_at(&state, vec![topic("S")], now).await;
        assert_eq!(cache.get_at(&national, now).await.unwrap()[0].title, "N");
        assert_eq!(cache.get_at(&state, now).await.unwrap()[0].title, "S");
    }
}
