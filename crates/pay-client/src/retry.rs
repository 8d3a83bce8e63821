//! # Retry Policy
//!
//! Bounded linear backoff for transient failures. Only transport errors and
//! HTTP 503 are retried; every other response goes straight back to the
//! caller, who inspects the status.
//!
//! The client applies one policy to every call it makes, so retry coverage
//! does not depend on the call site.

use reqwest::{Response, StatusCode};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy for payment service calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_backoff: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(1000);

    /// Create a policy; `max_attempts` is clamped to at least 1
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Single attempt, no retries
    pub fn disabled() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_backoff(&self) -> Duration {
        self.base_backoff
    }

    /// Wait before the retry that follows attempt `attempt_index` (0-based)
    pub fn backoff_for(&self, attempt_index: u32) -> Duration {
        self.base_backoff.saturating_mul(attempt_index.saturating_add(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_BASE_BACKOFF)
    }
}

/// A response that can signal temporary unavailability
pub trait RetryableResponse {
    fn is_unavailable(&self) -> bool;
}

impl RetryableResponse for Response {
    fn is_unavailable(&self) -> bool {
        self.status() == StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Run `op` under `policy`.
///
/// Returns the first response that is not a retryable 503, the last 503
/// once attempts run out, or the error of the final attempt.
pub async fn fetch_with_retry<F, Fut, R, E>(policy: &RetryPolicy, mut op: F) -> Result<R, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    R: RetryableResponse,
    E: Display,
{
    let mut attempt: u32 = 0;
    loop {
        let is_last = attempt + 1 >= policy.max_attempts;
        let delay = policy.backoff_for(attempt);

        match op().await {
            Ok(response) if response.is_unavailable() && !is_last => {
                warn!(
                    "Service unavailable (503), retrying: attempt={}/{}, delay_ms={}",
                    attempt + 1,
                    policy.max_attempts,
                    delay.as_millis()
                );
            }
            Ok(response) => return Ok(response),
            Err(e) if !is_last => {
                warn!(
                    "Request failed, retrying: attempt={}/{}, delay_ms={}, error={}",
                    attempt + 1,
                    policy.max_attempts,
                    delay.as_millis(),
                    e
                );
            }
            Err(e) => return Err(e),
        }

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
