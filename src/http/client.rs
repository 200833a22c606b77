//! HTTP client with built-in retry logic and error handling.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::retry::{NonRetryableError, RetryPolicy, check_retryable, is_retryable};

/// HTTP client with built-in retry logic for network operations.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    policy: RetryPolicy,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Performs a GET request and deserializes the JSON response.
    /// Automatically retries on transient errors.
    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET JSON from {}...", url);

        self.with_retry("GET JSON", || async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .context("Failed to send request")?;

            let response = response.error_for_status().map_err(check_retryable)?;

            response.json::<T>().await.map_err(|e| {
                if e.is_decode() {
                    NonRetryableError::InvalidResponse(format!("{}: {}", url, e)).into()
                } else {
                    anyhow::Error::from(e).context("Failed to read response")
                }
            })
        })
        .await
    }

    /// Like [`get_json`](Self::get_json), but a 404 yields `Ok(None)`.
    #[tracing::instrument(skip(self))]
    pub async fn get_json_if_exists<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        match self.get_json(url).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if matches!(
                e.downcast_ref::<NonRetryableError>(),
                Some(NonRetryableError::NotFound(_))
            ) =>
            {
                debug!("{} does not exist", url);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Executes an async operation with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let attempts = self.policy.attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !is_retryable(&e) {
                        debug!("{}: non-retryable error: {}", operation_name, e);
                        return Err(e);
                    }

                    if attempt < attempts {
                        warn!(
                            "{}: attempt {}/{} failed ({}), retrying in {:?}...",
                            operation_name, attempt, attempts, e, self.policy.delay
                        );
                        tokio::time::sleep(self.policy.delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow::anyhow!("{}: failed after {} attempts", operation_name, attempts)
        }))
    }
}
