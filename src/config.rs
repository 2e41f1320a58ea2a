use std::{env, net::SocketAddr, num::NonZeroUsize, time::Duration};

use thiserror::Error;

use crate::pipeline::clustering::ClusteringParams;
use crate::pipeline::navigation::NavigationSettings;
use crate::pipeline::orchestrator::EngineSettings;
use crate::pipeline::rotation::RotationSettings;
use crate::pipeline::stance::StanceSplitSettings;
use crate::util::retry::RetryConfig;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

/// Worker configuration, loaded once from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    embedding_source_base_url: String,
    stance_classifier_base_url: String,
    completion_base_url: String,
    similarity_index_base_url: String,
    client_connect_timeout: Duration,
    client_total_timeout: Duration,
    completion_timeout: Duration,
    http_max_retries: usize,
    http_backoff_base_ms: u64,
    http_backoff_cap_ms: u64,
    similarity_threshold: f32,
    wide_similarity_threshold: f32,
    wide_clustering: bool,
    min_posts_per_topic: NonZeroUsize,
    max_clusters: usize,
    max_candidates: usize,
    candidate_window: Duration,
    topic_ttl: Duration,
    stance_batch_size: NonZeroUsize,
    stance_batch_pause: Duration,
    single_vector_fallback: bool,
    navigation_threshold_offset: f32,
    navigation_filter_limit: usize,
    default_feed_limit: usize,
    rotation_bucket_seconds: u64,
    rotation_window_size: usize,
    summary_max_tokens: u32,
    summary_sample_per_side: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// Load and validate the worker configuration from the environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a required base URL is unset or a value
    /// fails to parse or falls outside its valid range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_bind = parse_socket_addr("PULSE_WORKER_HTTP_BIND", "0.0.0.0:9010")?;
        let embedding_source_base_url = env_var("EMBEDDING_SOURCE_BASE_URL")?;
        let stance_classifier_base_url = env_var("STANCE_CLASSIFIER_BASE_URL")?;
        let completion_base_url = env_var("COMPLETION_BASE_URL")?;
        let similarity_index_base_url = env_var("SIMILARITY_INDEX_BASE_URL")?;

        let client_connect_timeout = parse_duration_ms("CLIENT_CONNECT_TIMEOUT_MS", 3000)?;
        let client_total_timeout = parse_duration_ms("CLIENT_TOTAL_TIMEOUT_MS", 20_000)?;
        let completion_timeout = parse_duration_ms("COMPLETION_TIMEOUT_MS", 30_000)?;

        let http_max_retries = parse_usize("HTTP_MAX_RETRIES", 3)?;
        let http_backoff_base_ms = parse_u64("HTTP_BACKOFF_BASE_MS", 250)?;
        let http_backoff_cap_ms = parse_u64("HTTP_BACKOFF_CAP_MS", 10_000)?;

        let similarity_threshold = parse_unit_f32("TOPIC_SIMILARITY_THRESHOLD", 0.70)?;
        let wide_similarity_threshold = parse_unit_f32("TOPIC_WIDE_SIMILARITY_THRESHOLD", 0.60)?;
        // The wide variant deliberately lowers the threshold so opposing
        // viewpoints land in one cluster for the stance splitter.
        let wide_clustering = parse_bool("TOPIC_WIDE_CLUSTERING", false)?;
        let min_posts_per_topic = parse_non_zero_usize("TOPIC_MIN_POSTS", 3)?;
        let max_clusters = parse_usize("TOPIC_MAX_CLUSTERS", 20)?;
        let max_candidates = parse_usize("TOPIC_MAX_CANDIDATES", 1000)?;
        let candidate_window =
            Duration::from_secs(parse_u64("CANDIDATE_WINDOW_HOURS", 72)? * 3600);
        let topic_ttl = Duration::from_secs(parse_u64("TOPIC_CACHE_TTL_SECONDS", 900)?);

        let stance_batch_size = parse_non_zero_usize("STANCE_BATCH_SIZE", 5)?;
        let stance_batch_pause = parse_duration_ms("STANCE_BATCH_PAUSE_MS", 200)?;
        let single_vector_fallback = parse_bool("TOPIC_SINGLE_VECTOR_FALLBACK", false)?;

        let navigation_threshold_offset = parse_unit_f32("NAV_THRESHOLD_OFFSET", 0.05)?;
        let navigation_filter_limit = parse_usize("NAV_FILTER_LIMIT", 50)?;
        let default_feed_limit = parse_usize("NAV_DEFAULT_FEED_LIMIT", 50)?;

        let rotation_bucket_seconds = parse_u64("ROTATION_BUCKET_SECONDS", 3600)?;
        let rotation_window_size = parse_usize("ROTATION_WINDOW_SIZE", 5)?;

        let summary_max_tokens = parse_u32("SUMMARY_MAX_TOKENS", 512)?;
        let summary_sample_per_side = parse_usize("SUMMARY_SAMPLE_PER_SIDE", 3)?;

        Ok(Self {
            http_bind,
            embedding_source_base_url,
            stance_classifier_base_url,
            completion_base_url,
            similarity_index_base_url,
            client_connect_timeout,
            client_total_timeout,
            completion_timeout,
            http_max_retries,
            http_backoff_base_ms,
            http_backoff_cap_ms,
            similarity_threshold,
            wide_similarity_threshold,
            wide_clustering,
            min_posts_per_topic,
            max_clusters,
            max_candidates,
            candidate_window,
            topic_ttl,
            stance_batch_size,
            stance_batch_pause,
            single_vector_fallback,
            navigation_threshold_offset,
            navigation_filter_limit,
            default_feed_limit,
            rotation_bucket_seconds,
            rotation_window_size,
            summary_max_tokens,
            summary_sample_per_side,
        })
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    #[must_use]
    pub fn embedding_source_base_url(&self) -> &str {
        &self.embedding_source_base_url
    }

    #[must_use]
    pub fn stance_classifier_base_url(&self) -> &str {
        &self.stance_classifier_base_url
    }

    #[must_use]
    pub fn completion_base_url(&self) -> &str {
        &self.completion_base_url
    }

    #[must_use]
    pub fn similarity_index_base_url(&self) -> &str {
        &self.similarity_index_base_url
    }

    #[must_use]
    pub fn client_connect_timeout(&self) -> Duration {
        self.client_connect_timeout
    }

    #[must_use]
    pub fn client_total_timeout(&self) -> Duration {
        self.client_total_timeout
    }

    #[must_use]
    pub fn completion_timeout(&self) -> Duration {
        self.completion_timeout
    }

    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            self.http_max_retries,
            self.http_backoff_base_ms,
            self.http_backoff_cap_ms,
        )
    }

    /// Effective clustering threshold: the wide variant wins when enabled.
    #[must_use]
    pub fn effective_similarity_threshold(&self) -> f32 {
        if self.wide_clustering {
            self.wide_similarity_threshold
        } else {
            self.similarity_threshold
        }
    }

    #[must_use]
    pub fn clustering_params(&self) -> ClusteringParams {
        ClusteringParams {
            similarity_threshold: self.effective_similarity_threshold(),
            min_posts_per_topic: self.min_posts_per_topic.get(),
            max_clusters: self.max_clusters,
            max_candidates: self.max_candidates,
        }
    }

    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            clustering: self.clustering_params(),
            candidate_window: self.candidate_window,
            topic_ttl: self.topic_ttl,
        }
    }

    #[must_use]
    pub fn stance_split_settings(&self) -> StanceSplitSettings {
        StanceSplitSettings {
            batch_size: self.stance_batch_size.get(),
            batch_pause: self.stance_batch_pause,
            single_vector_fallback: self.single_vector_fallback,
        }
    }

    #[must_use]
    pub fn navigation_settings(&self) -> NavigationSettings {
        NavigationSettings {
            score_threshold: (self.effective_similarity_threshold()
                - self.navigation_threshold_offset)
                .max(0.0),
            filter_limit: self.navigation_filter_limit,
            default_feed_limit: self.default_feed_limit,
        }
    }

    #[must_use]
    pub fn rotation_settings(&self) -> RotationSettings {
        RotationSettings {
            bucket_seconds: self.rotation_bucket_seconds,
            window_size: self.rotation_window_size,
        }
    }

    #[must_use]
    pub fn topic_ttl(&self) -> Duration {
        self.topic_ttl
    }

    #[must_use]
    pub fn summary_max_tokens(&self) -> u32 {
        self.summary_max_tokens
    }

    #[must_use]
    pub fn summary_sample_per_side(&self) -> usize {
        self.summary_sample_per_side
    }
}

fn env_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_socket_addr(name: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse().map_err(|err| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(err),
    })
}

fn parse_duration_ms(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    Ok(Duration::from_millis(parse_u64(name, default)?))
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|err| ConfigError::Invalid {
            name,
            source: anyhow::Error::new(err),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_u32(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|err| ConfigError::Invalid {
            name,
            source: anyhow::Error::new(err),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|err| ConfigError::Invalid {
            name,
            source: anyhow::Error::new(err),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_non_zero_usize(name: &'static str, default: usize) -> Result<NonZeroUsize, ConfigError> {
    let value = parse_usize(name, default)?;
    NonZeroUsize::new(value).ok_or_else(|| ConfigError::Invalid {
        name,
        source: anyhow::anyhow!("must be greater than zero"),
    })
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::Invalid {
                name,
                source: anyhow::anyhow!("not a boolean: {other}"),
            }),
        },
        Err(_) => Ok(default),
    }
}

/// Parse a float constrained to (0.0, 1.0].
fn parse_unit_f32(name: &'static str, default: f32) -> Result<f32, ConfigError> {
    let value = match env::var(name) {
        Ok(raw) => raw.parse::<f32>().map_err(|err| ConfigError::Invalid {
            name,
            source: anyhow::Error::new(err),
        })?,
        Err(_) => default,
    };
    if value <= 0.0 || value > 1.0 {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("must be within (0.0, 1.0], got {value}"),
        });
    }
    Ok(value)
}
