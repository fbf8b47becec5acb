//! Rate limiting and pacing for remote service calls and document batches.
//!
//! Provides adaptive per-key pacing with a pluggable backend. Keys are
//! service names (`analysis`, `language`, ...) for call throttling, and
//! `documents` for the pause between documents of a batch.

mod backend;
mod config;
mod limiter;
mod memory;

pub use backend::{KeyRateState, RateLimitBackend, RateLimitError, RateLimitResult};
pub use config::{KeyStats, RateLimitConfig};
pub use limiter::{BoxedRateLimitBackend, RateLimiter};
pub use memory::InMemoryRateLimitBackend;

/// Key used to pace documents within a batch.
pub const DOCUMENTS_KEY: &str = "documents";

/// Parse Retry-After header value (seconds).
/// Returns duration to wait, or None if header is missing/invalid.
pub fn parse_retry_after(header_value: Option<&str>) -> Option<std::time::Duration> {
    let value = header_value?;
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| std::time::Duration::from_secs(secs.min(60)))
}
