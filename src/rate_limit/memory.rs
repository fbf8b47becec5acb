//! In-memory rate limit backend for single-process operation.
//!
//! Fast, lock-based backend for rate limiting within a single process.
//! State is not persisted across restarts. Uses the tokio clock so paused
//! time in tests applies to pacing as well.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::backend::{KeyRateState, RateLimitBackend, RateLimitResult};

/// Internal state for a key.
#[derive(Debug)]
struct KeyEntry {
    current_delay_ms: u64,
    last_request: Option<Instant>,
    consecutive_successes: u32,
    in_backoff: bool,
    total_requests: u64,
    rate_limit_hits: u64,
}

impl KeyEntry {
    fn new(base_delay_ms: u64) -> Self {
        Self {
            current_delay_ms: base_delay_ms,
            last_request: None,
            consecutive_successes: 0,
            in_backoff: false,
            total_requests: 0,
            rate_limit_hits: 0,
        }
    }

    fn to_state(&self, key: &str) -> KeyRateState {
        KeyRateState {
            key: key.to_string(),
            current_delay_ms: self.current_delay_ms,
            consecutive_successes: self.consecutive_successes,
            in_backoff: self.in_backoff,
            total_requests: self.total_requests,
            rate_limit_hits: self.rate_limit_hits,
        }
    }

    fn time_until_ready(&self) -> Duration {
        match self.last_request {
            Some(last) => {
                let now = Instant::now();
                let ready_at = last + Duration::from_millis(self.current_delay_ms);
                ready_at.saturating_duration_since(now)
            }
            None => Duration::ZERO,
        }
    }
}

/// In-memory rate limit backend.
#[derive(Clone, Default)]
pub struct InMemoryRateLimitBackend {
    keys: Arc<RwLock<HashMap<String, KeyEntry>>>,
}

impl InMemoryRateLimitBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitBackend for InMemoryRateLimitBackend {
    async fn get_or_create(&self, key: &str, base_delay_ms: u64) -> RateLimitResult<KeyRateState> {
        let keys = self.keys.read().await;
        if let Some(entry) = keys.get(key) {
            return Ok(entry.to_state(key));
        }
        drop(keys);

        let mut keys = self.keys.write().await;
        let entry = keys
            .entry(key.to_string())
            .or_insert_with(|| KeyEntry::new(base_delay_ms));
        Ok(entry.to_state(key))
    }

    async fn update(&self, state: &KeyRateState) -> RateLimitResult<()> {
        let mut keys = self.keys.write().await;
        if let Some(entry) = keys.get_mut(&state.key) {
            entry.current_delay_ms = state.current_delay_ms;
            entry.consecutive_successes = state.consecutive_successes;
            entry.in_backoff = state.in_backoff;
            entry.total_requests = state.total_requests;
            entry.rate_limit_hits = state.rate_limit_hits;
        }
        Ok(())
    }

    async fn acquire(&self, key: &str, base_delay_ms: u64) -> RateLimitResult<Duration> {
        let mut keys = self.keys.write().await;
        let entry = keys
            .entry(key.to_string())
            .or_insert_with(|| KeyEntry::new(base_delay_ms));
        let wait_time = entry.time_until_ready();
        entry.last_request = Some(Instant::now() + wait_time);
        entry.total_requests += 1;
        Ok(wait_time)
    }

    async fn touch(&self, key: &str, base_delay_ms: u64) -> RateLimitResult<()> {
        let mut keys = self.keys.write().await;
        let entry = keys
            .entry(key.to_string())
            .or_insert_with(|| KeyEntry::new(base_delay_ms));
        entry.last_request = Some(Instant::now());
        Ok(())
    }
}
