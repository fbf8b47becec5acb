//! Pluggable backend trait for rate limiting storage.

use async_trait::async_trait;
use std::time::Duration;

/// Result type for rate limit operations.
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// Errors from rate limit backend operations.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Pacing state for one key.
#[derive(Debug, Clone)]
pub struct KeyRateState {
    pub key: String,
    pub current_delay_ms: u64,
    pub consecutive_successes: u32,
    pub in_backoff: bool,
    pub total_requests: u64,
    pub rate_limit_hits: u64,
}

impl KeyRateState {
    pub fn current_delay(&self) -> Duration {
        Duration::from_millis(self.current_delay_ms)
    }
}

/// Trait for rate limit storage backends.
///
/// Implementations must be thread-safe and handle concurrent access.
#[async_trait]
pub trait RateLimitBackend: Send + Sync {
    /// Get or create state for a key.
    async fn get_or_create(&self, key: &str, base_delay_ms: u64) -> RateLimitResult<KeyRateState>;

    /// Update key state after a request.
    async fn update(&self, state: &KeyRateState) -> RateLimitResult<()>;

    /// Atomically acquire a request slot for a key.
    /// Returns the wait time (0 if ready now), and marks the request as started.
    async fn acquire(&self, key: &str, base_delay_ms: u64) -> RateLimitResult<Duration>;

    /// Restart the delay window for a key from now, without counting a request.
    async fn touch(&self, key: &str, base_delay_ms: u64) -> RateLimitResult<()>;
}
