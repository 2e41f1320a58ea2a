//! Rotating topic subset for compact display surfaces.
//!
//! The ordered topic list is cut into fixed-size windows and the active
//! window rotates on a wall-clock bucket. Deterministic given the list and
//! the clock, so every caller in the same bucket sees the same subset.

use chrono::{DateTime, Utc};

use super::types::Topic;

#[derive(Debug, Clone, Copy)]
pub struct RotationSettings {
    /// Wall-clock seconds per rotation bucket.
    pub bucket_seconds: u64,
    /// Topics shown per window.
    pub window_size: usize,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            bucket_seconds: 3600,
            window_size: 5,
        }
    }
}

/// Select the active window of `topics` for the bucket containing `now`.
///
/// Windows wrap: with 12 topics and a window of 5 the buckets cycle through
/// topics 0-4, 5-9, 10-11. An empty list yields an empty slice.
#[must_use]
pub fn rotating_subset<'a>(
    topics: &'a [Topic],
    settings: &RotationSettings,
    now: DateTime<Utc>,
) -> &'a [Topic] {
    if topics.is_empty() || settings.window_size == 0 {
        return &[];
    }

    let window_count = topics.len().div_ceil(settings.window_size);
    let bucket_seconds = settings.bucket_seconds.max(1);
    let bucket = (now.timestamp().max(0) as u64 / bucket_seconds) as usize % window_count;

    let start = bucket * settings.window_size;
    let end = (start + settings.window_size).min(topics.len());
    &topics[start..end]
}
