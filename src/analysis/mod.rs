//! Asynchronous job lifecycle: submit, poll to a terminal state, paginate.
//!
//! [`DocumentProcessor`] composes the three stages for one request. Polling
//! and pagination share a single [`Deadline`] and observe a
//! `CancellationToken`; transient service failures are retried with
//! [`RetryPolicy`].

mod error;
mod paginator;
mod poller;
mod processor;
mod retry;
mod submitter;

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub use error::ProcessingError;
pub use paginator::ResultPaginator;
pub use poller::{JobPoller, DEFAULT_POLL_INTERVAL};
pub use processor::{DocumentProcessor, ProcessorOptions};
pub use retry::RetryPolicy;
pub use submitter::{JobSubmitter, Submission};

/// Point in time after which polling and pagination give up.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
    budget: Duration,
}

impl Deadline {
    /// A deadline `budget` from now; `None` or a zero budget never expires.
    pub fn after(budget: Option<Duration>) -> Self {
        match budget {
            Some(budget) if !budget.is_zero() => Self {
                at: Some(Instant::now() + budget),
                budget,
            },
            _ => Self::unbounded(),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            at: None,
            budget: Duration::ZERO,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.at.is_some()
    }

    async fn expired(self) {
        match self.at {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}

/// Run `work` unless the token is cancelled or the deadline passes first.
async fn guarded<T, F>(
    work: F,
    cancel: &CancellationToken,
    deadline: Deadline,
) -> Result<T, ProcessingError>
where
    F: Future<Output = Result<T, ProcessingError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProcessingError::Cancelled),
        _ = deadline.expired() => Err(ProcessingError::TimedOut(deadline.budget)),
        result = work => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_unbounded() {
        assert!(!Deadline::after(Some(Duration::ZERO)).is_bounded());
        assert!(!Deadline::after(None).is_bounded());
        assert!(Deadline::after(Some(Duration::from_secs(1800))).is_bounded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_guarded_times_out_slow_work() {
        let result: Result<(), _> = guarded(
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            },
            &CancellationToken::new(),
            Deadline::after(Some(Duration::from_secs(10))),
        )
        .await;

        assert!(matches!(result, Err(ProcessingError::TimedOut(d)) if d == Duration::from_secs(10)));
    }
}
