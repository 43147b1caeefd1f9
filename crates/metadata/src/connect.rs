//! Connection establishment with bounded retry.

use crate::error::{CatalogError, CatalogResult};
use assetcat_core::config::ConnectRetryConfig;
use std::future::Future;
use std::time::Duration;

/// How many times to try connecting and how long to wait in between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl From<&ConnectRetryConfig> for RetryPolicy {
    fn from(config: &ConnectRetryConfig) -> Self {
        Self::new(config.max_attempts, config.delay())
    }
}

/// Run `attempt` until it succeeds or the policy is exhausted.
///
/// `attempt` receives the 1-based attempt number. The delay is only slept
/// between attempts, never after the last one. Exhaustion is reported as
/// [`CatalogError::ConnectionExhausted`], which callers treat as fatal.
/// Errors that are not [transient](CatalogError::is_transient) are returned
/// as-is without further attempts.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    target: &str,
    mut attempt: F,
) -> CatalogResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = CatalogResult<T>>,
{
    let mut last_error = String::new();

    for n in 1..=policy.max_attempts {
        match attempt(n).await {
            Ok(value) => {
                if n > 1 {
                    tracing::info!(endpoint = target, attempt = n, "catalog connection established");
                }
                return Ok(value);
            }
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) => {
                tracing::warn!(
                    endpoint = target,
                    attempt = n,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    "catalog connection attempt failed"
                );
                last_error = err.to_string();
                if n < policy.max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    tracing::error!(
        endpoint = target,
        attempts = policy.max_attempts,
        "giving up on catalog connection"
    );
    Err(CatalogError::ConnectionExhausted {
        target: target.to_string(),
        attempts: policy.max_attempts,
        last_error,
    })
}
