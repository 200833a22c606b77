//! Retry policy for GitHub and npm registry requests.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Maximum number of attempts for one request.
pub const MAX_RETRIES: usize = 3;

/// Delay between attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: MAX_RETRIES,
            delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy without waiting between attempts.
    pub fn immediate(attempts: usize) -> Self {
        Self {
            attempts,
            delay: Duration::ZERO,
        }
    }
}

/// Errors that should not be retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NonRetryableError {
    /// HTTP 403 mentioning a rate limit, or 429
    #[error("Rate limit exceeded: {0}. Try again later or set GITHUB_TOKEN.")]
    RateLimitExceeded(String),

    /// HTTP 401
    #[error("Authentication failed: {0}. Check your GITHUB_TOKEN.")]
    AuthenticationFailed(String),

    /// HTTP 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 403 without a rate limit message
    #[error("Access forbidden: {0}. You may need authentication.")]
    Forbidden(String),

    /// Any other 4xx
    #[error("Request error: {0}")]
    ClientError(String),

    /// A successful response whose body is not the expected JSON
    #[error("Invalid response from {0}")]
    InvalidResponse(String),
}

/// Classifies an error as retryable or non-retryable.
/// Returns Ok(()) if the error is retryable.
pub fn classify_error(error: &reqwest::Error) -> Result<(), NonRetryableError> {
    let Some(status) = error.status() else {
        // Connection errors, timeouts, etc.
        return Ok(());
    };

    let url = error
        .url()
        .map(|u| u.to_string())
        .unwrap_or_else(|| "request".to_string());

    match status {
        StatusCode::UNAUTHORIZED => Err(NonRetryableError::AuthenticationFailed(url)),
        StatusCode::FORBIDDEN => {
            if error.to_string().contains("rate limit") {
                Err(NonRetryableError::RateLimitExceeded(url))
            } else {
                Err(NonRetryableError::Forbidden(url))
            }
        }
        StatusCode::TOO_MANY_REQUESTS => Err(NonRetryableError::RateLimitExceeded(url)),
        StatusCode::NOT_FOUND => Err(NonRetryableError::NotFound(url)),
        s if s.is_client_error() => Err(NonRetryableError::ClientError(format!(
            "HTTP {} from {}",
            s.as_u16(),
            url
        ))),
        // 5xx
        _ => Ok(()),
    }
}

/// Wraps an error from `error_for_status()`, tagging the ones not worth retrying.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match classify_error(&error) {
        Ok(()) => anyhow::Error::from(error),
        Err(non_retryable) => anyhow::Error::from(non_retryable),
    }
}

/// True unless the error chain carries a [`NonRetryableError`].
pub fn is_retryable(error: &anyhow::Error) -> bool {
    error.downcast_ref::<NonRetryableError>().is_none()
}
