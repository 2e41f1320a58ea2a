//! Exponential backoff with Full Jitter for outbound HTTP calls.

use std::time::Duration;

use rand::Rng;

use super::error::is_retryable;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum attempts, the first call included.
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn new(max_attempts: usize, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Delay before the given attempt (0-based): `random(0, min(cap,
    /// base * 2^(attempt-1)))`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let shift = u32::try_from(attempt - 1).unwrap_or(u32::MAX).min(32);
        let exponential = self.base_delay_ms.saturating_mul(1_u64 << shift);
        let capped = exponential.min(self.max_delay_ms);

        let jittered = if capped > 0 {
            rand::rng().random_range(0..=capped)
        } else {
            0
        };
        Duration::from_millis(jittered)
    }

    #[must_use]
    pub const fn can_retry(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }
}

/// Run `operation` with retries on retryable errors only.
pub async fn retry_async<T, F, Fut>(config: &RetryConfig, operation: F) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 0_usize;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                attempt += 1;
                if !config.can_retry(attempt) || !is_retryable(&error) {
                    return Err(error);
                }
                let delay = config.delay_for_attempt(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn first_attempt_has_no_delay() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
    }

    #[test]
    fn delays_are_bounded_by_cap() {
        let config = RetryConfig::new(5, 250, 1_000);
        for attempt in 1..10 {
            assert!(config.delay_for_attempt(attempt) <= Duration::from_millis(1_000));
        }
    }

    #[test]
    fn can_retry_respects_max_attempts() {
        let config = RetryConfig::new(3, 1, 1);
        assert!(config.can_retry(1));
        assert!(config.can_retry(2));
        assert!(!config.can_retry(3));
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_immediately() {
        let calls = AtomicUsize::new(0);
        let config = RetryConfig::new(5, 1, 1);
        let result: anyhow::Result<()> = retry_async(&config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(anyhow!("deterministic failure")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_passes_through() {
        let config = RetryConfig::default();
        let value = retry_async(&config, || async { Ok(42_u32) }).await.unwrap();
        assert_eq!(value, 42);
    }
}
