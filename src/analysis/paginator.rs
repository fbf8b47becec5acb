//! Continuation-token pagination of job results.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{guarded, Deadline, ProcessingError, RetryPolicy};
use crate::models::{Job, ResultSet};
use crate::services::{AnalysisMode, AnalysisService, ServiceError};

/// Collects every result page of a finished job into one ordered set.
pub struct ResultPaginator {
    service: Arc<dyn AnalysisService>,
    retry: RetryPolicy,
    max_pages: Option<usize>,
}

impl ResultPaginator {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self {
            service,
            retry: RetryPolicy::default(),
            max_pages: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fail once more than `max_pages` pages have been returned.
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Fetch the first page, then follow continuation tokens until a page
    /// has none. A failure discards every page fetched so far.
    pub async fn collect(
        &self,
        job: &Job,
        mode: AnalysisMode,
        cancel: &CancellationToken,
        deadline: Deadline,
    ) -> Result<ResultSet, ProcessingError> {
        let job_id = job.id();
        let mut results = ResultSet::new();
        let mut token: Option<String> = None;

        loop {
            if let Some(max) = self.max_pages {
                if results.len() >= max {
                    return Err(ProcessingError::ResultFetchFailed {
                        job_id: job_id.clone(),
                        source: ServiceError::invalid(
                            "analysis",
                            format!("more than {} result pages", max),
                        ),
                    });
                }
            }

            let page = guarded(
                async {
                    self.retry
                        .run("Result page fetch", || {
                            self.service.get_job_page(job_id, mode, token.as_deref())
                        })
                        .await
                        .map_err(|source| ProcessingError::ResultFetchFailed {
                            job_id: job_id.clone(),
                            source,
                        })
                },
                cancel,
                deadline,
            )
            .await?;

            let pushed = results.push(page.payload);
            debug!(
                "Job {}: result page {} ({} blocks)",
                job_id,
                pushed.ordinal,
                pushed.payload.blocks.len()
            );

            match &pushed.continuation_token {
                Some(next) => token = Some(next.clone()),
                None => break,
            }
        }

        info!("Job {}: collected {} result pages", job_id, results.len());
        Ok(results)
    }
}
