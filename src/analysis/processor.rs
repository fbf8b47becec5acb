//! One-document pipeline from request to complete result set.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{
    guarded, Deadline, JobPoller, JobSubmitter, ProcessingError, ResultPaginator, RetryPolicy,
    Submission, DEFAULT_POLL_INTERVAL,
};
use crate::models::{AnalysisRequest, ResultSet};
use crate::services::AnalysisService;

/// Tuning for the job lifecycle.
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    pub poll_interval: Duration,
    /// Budget shared by polling and pagination. `None` waits forever.
    pub poll_timeout: Option<Duration>,
    pub retry: RetryPolicy,
    pub max_result_pages: Option<usize>,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: Some(Duration::from_secs(1800)),
            retry: RetryPolicy::default(),
            max_result_pages: None,
        }
    }
}

/// Runs submit, poll and paginate for one validated request.
pub struct DocumentProcessor {
    submitter: JobSubmitter,
    poller: JobPoller,
    paginator: ResultPaginator,
    poll_timeout: Option<Duration>,
}

impl DocumentProcessor {
    pub fn new(service: Arc<dyn AnalysisService>, options: ProcessorOptions) -> Self {
        Self {
            submitter: JobSubmitter::new(service.clone()).with_retry(options.retry.clone()),
            poller: JobPoller::new(service.clone())
                .with_interval(options.poll_interval)
                .with_retry(options.retry.clone()),
            paginator: ResultPaginator::new(service)
                .with_retry(options.retry)
                .with_max_pages(options.max_result_pages),
            poll_timeout: options.poll_timeout,
        }
    }

    pub async fn process(
        &self,
        request: &AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<ResultSet, ProcessingError> {
        let submission = guarded(
            self.submitter.submit(request),
            cancel,
            Deadline::unbounded(),
        )
        .await?;

        match submission {
            Submission::Complete(results) => {
                debug!(
                    "{}: synchronous result with {} blocks",
                    request.source(),
                    results.blocks().count()
                );
                Ok(results)
            }
            Submission::Started { mut job, mode } => {
                let deadline = Deadline::after(self.poll_timeout);
                self.poller.wait(&mut job, mode, cancel, deadline).await?;
                let results = self.paginator.collect(&job, mode, cancel, deadline).await?;
                info!(
                    "{}: job {} complete, {} result pages",
                    request.source(),
                    job.id(),
                    results.len()
                );
                Ok(results)
            }
        }
    }
}
