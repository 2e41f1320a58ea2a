//! Error classification for outbound HTTP calls.

use anyhow::Error;
use reqwest::StatusCode;

/// Coarse error category used by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient: network failure, timeout, 5xx, 429.
    Retryable,
    /// Deterministic failure that will not improve on retry.
    NonRetryable,
    /// Configuration or authorization problem; retrying hides a real bug.
    Fatal,
}

#[must_use]
pub fn classify_error(error: &Error) -> ErrorKind {
    if let Some(reqwest_err) = error.downcast_ref::<reqwest::Error>() {
        if reqwest_err.is_timeout() || reqwest_err.is_connect() {
            return ErrorKind::Retryable;
        }

        if let Some(status) = reqwest_err.status() {
            match status {
                StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
                | StatusCode::TOO_MANY_REQUESTS => return ErrorKind::Retryable,
                StatusCode::BAD_REQUEST
                | StatusCode::NOT_FOUND
                | StatusCode::UNPROCESSABLE_ENTITY => return ErrorKind::NonRetryable,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return ErrorKind::Fatal,
                _ => {}
            }
        }
    }

    ErrorKind::NonRetryable
}

#[must_use]
pub fn is_retryable(error: &Error) -> bool {
    matches!(classify_error(error), ErrorKind::Retryable)
}

#[must_use]
pub fn is_fatal(error: &Error) -> bool {
    matches!(classify_error(error), ErrorKind::Fatal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn plain_errors_are_non_retryable() {
        let error = anyhow!("validation failed");
        assert_eq!(classify_error(&error), ErrorKind::NonRetryable);
        assert!(!is_retryable(&error));
        assert!(!is_fatal(&error));
    }
}
