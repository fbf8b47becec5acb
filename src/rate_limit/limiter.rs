//! Adaptive per-key rate limiter.
//!
//! Provides a high-level pacing API that wraps a pluggable backend.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

pub use super::config::{KeyStats, RateLimitConfig};

use super::backend::RateLimitBackend;

/// Type alias for a boxed rate limit backend.
pub type BoxedRateLimitBackend = Arc<dyn RateLimitBackend>;

/// Adaptive rate limiter that tracks per-key request timing.
///
/// Wraps a `RateLimitBackend` and provides high-level pacing logic:
/// - Exponential backoff when a service throttles
/// - Gradual recovery after consecutive successes
/// - Fixed pauses between batch items via `mark_complete` + `acquire`
#[derive(Clone)]
pub struct RateLimiter {
    backend: BoxedRateLimitBackend,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter with the given backend.
    pub fn new(backend: BoxedRateLimitBackend) -> Self {
        Self::with_config(backend, RateLimitConfig::default())
    }

    /// Create a new rate limiter with custom config.
    pub fn with_config(backend: BoxedRateLimitBackend, config: RateLimitConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn base_delay_ms(&self) -> u64 {
        self.config.base_delay.as_millis() as u64
    }

    /// Wait until the key is ready, then mark a request as started.
    /// Returns how long we waited.
    pub async fn acquire(&self, key: &str) -> Duration {
        match self.backend.acquire(key, self.base_delay_ms()).await {
            Ok(wait_time) => {
                if wait_time > Duration::ZERO {
                    debug!("Pacing {}: waiting {:?}", key, wait_time);
                    tokio::time::sleep(wait_time).await;
                }
                wait_time
            }
            Err(e) => {
                warn!("Rate limit acquire failed for {}: {}", key, e);
                // Fall back to allowing the request
                Duration::ZERO
            }
        }
    }

    /// Start the delay window for a key now, e.g. when a batch item finishes.
    pub async fn mark_complete(&self, key: &str) {
        if let Err(e) = self.backend.touch(key, self.base_delay_ms()).await {
            warn!("Failed to mark {} complete: {}", key, e);
        }
    }

    /// Report a successful request - may decrease delay.
    pub async fn report_success(&self, key: &str) {
        let base_delay_ms = self.base_delay_ms();

        let mut state = match self.backend.get_or_create(key, base_delay_ms).await {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to get rate state for {}: {}", key, e);
                return;
            }
        };

        state.consecutive_successes += 1;

        // Recover from backoff after threshold successes
        if state.in_backoff && state.consecutive_successes >= self.config.recovery_threshold {
            let new_delay_ms =
                (state.current_delay_ms as f64 * self.config.recovery_multiplier) as u64;
            state.current_delay_ms = new_delay_ms.max(self.config.min_delay.as_millis() as u64);

            if state.current_delay_ms <= base_delay_ms {
                state.in_backoff = false;
                state.current_delay_ms = base_delay_ms;
                info!("{} recovered from throttling backoff", key);
            } else {
                debug!("{} delay reduced to {}ms", key, state.current_delay_ms);
            }

            state.consecutive_successes = 0;
        }

        if let Err(e) = self.backend.update(&state).await {
            warn!("Failed to update rate state for {}: {}", key, e);
        }
    }

    /// Report that a service throttled us - increases delay.
    ///
    /// A server-provided `retry_after` raises the delay to at least that value.
    pub async fn report_throttled(&self, key: &str, retry_after: Option<Duration>) {
        let mut state = match self.backend.get_or_create(key, self.base_delay_ms()).await {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to get rate state for {}: {}", key, e);
                return;
            }
        };

        state.rate_limit_hits += 1;
        state.consecutive_successes = 0;
        state.in_backoff = true;

        let new_delay_ms = (state.current_delay_ms.max(1) as f64 * self.config.backoff_multiplier) as u64;
        let floor_ms = retry_after.map(|d| d.as_millis() as u64).unwrap_or(0);
        state.current_delay_ms = new_delay_ms
            .max(floor_ms)
            .min(self.config.max_delay.as_millis() as u64);

        warn!(
            "Throttled by {}, backing off to {}ms",
            key, state.current_delay_ms
        );

        if let Err(e) = self.backend.update(&state).await {
            warn!("Failed to update rate state for {}: {}", key, e);
        }
    }

    /// Report a server error - mild backoff.
    pub async fn report_server_error(&self, key: &str) {
        let mut state = match self.backend.get_or_create(key, self.base_delay_ms()).await {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to get rate state for {}: {}", key, e);
                return;
            }
        };

        // Mild backoff for server errors (might be overloaded)
        let new_delay_ms = (state.current_delay_ms.max(1) as f64 * 1.5) as u64;
        state.current_delay_ms = new_delay_ms.min(self.config.max_delay.as_millis() as u64);

        debug!(
            "Server error for {}, delay increased to {}ms",
            key, state.current_delay_ms
        );

        if let Err(e) = self.backend.update(&state).await {
            warn!("Failed to update rate state for {}: {}", key, e);
        }
    }

    /// Current statistics for a key.
    pub async fn stats(&self, key: &str) -> Option<KeyStats> {
        let state = self
            .backend
            .get_or_create(key, self.base_delay_ms())
            .await
            .ok()?;
        Some(KeyStats {
            current_delay: state.current_delay(),
            in_backoff: state.in_backoff,
            total_requests: state.total_requests,
            rate_limit_hits: state.rate_limit_hits,
        })
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
