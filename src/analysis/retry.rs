//! Bounded exponential backoff with full jitter for transient service failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::services::{ServiceError, ServiceResult};

/// How transient failures of a single remote call are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Upper bound of the backoff after `attempt` failed attempts (1-based).
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    /// Full-jitter delay: uniform in `[0, ceiling(attempt)]`, never below a
    /// server-requested `Retry-After`.
    pub fn delay_for(&self, attempt: u32, error: &ServiceError) -> Duration {
        let ceiling_ms = self.ceiling(attempt).as_millis() as u64;
        let jittered = Duration::from_millis(rand::rng().random_range(0..=ceiling_ms));
        match error.retry_after() {
            Some(retry_after) => jittered.max(retry_after),
            None => jittered,
        }
    }

    /// Run `op`, retrying transient failures until attempts run out.
    ///
    /// Non-transient errors are returned immediately.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> ServiceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ServiceResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt, &e);
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        what, attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
