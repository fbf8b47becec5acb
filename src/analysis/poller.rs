//! Status polling for asynchronous analysis jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{guarded, Deadline, ProcessingError, RetryPolicy};
use crate::models::{Job, JobStatus};
use crate::services::{AnalysisMode, AnalysisService};

/// Default pause before each status query.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Drives a job from SUBMITTED to a terminal state.
pub struct JobPoller {
    service: Arc<dyn AnalysisService>,
    interval: Duration,
    retry: RetryPolicy,
}

impl JobPoller {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self {
            service,
            interval: DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Poll until `job` reaches a terminal state.
    ///
    /// Each tick sleeps the poll interval and then issues one status query.
    /// A job that is already terminal is returned without querying.
    /// Returns `JobFailed` when the service reports failure.
    pub async fn wait(
        &self,
        job: &mut Job,
        mode: AnalysisMode,
        cancel: &CancellationToken,
        deadline: Deadline,
    ) -> Result<(), ProcessingError> {
        while !job.status().is_terminal() {
            guarded(
                async {
                    tokio::time::sleep(self.interval).await;
                    Ok(())
                },
                cancel,
                deadline,
            )
            .await?;

            let job_id = job.id().clone();
            let page = guarded(
                async {
                    self.retry
                        .run("Status query", || {
                            self.service.get_job_page(&job_id, mode, None)
                        })
                        .await
                        .map_err(|source| ProcessingError::StatusQueryFailed {
                            job_id: job_id.clone(),
                            source,
                        })
                },
                cancel,
                deadline,
            )
            .await?;

            let previous = job.status();
            let next = page.status;

            if next == JobStatus::Submitted {
                debug!("Job {} not started yet", job_id);
                continue;
            }

            job.transition(next)?;

            if previous != next {
                info!("Job {}: {} -> {}", job_id, previous, next);
            } else {
                debug!("Job {} still {}", job_id, next);
            }

            match next {
                JobStatus::Succeeded => {
                    if page.payload.job_status.as_deref() == Some("PARTIAL_SUCCESS") {
                        warn!(
                            "Job {} only partially succeeded: {}",
                            job_id,
                            page.status_message.as_deref().unwrap_or("no details")
                        );
                    }
                }
                JobStatus::Failed => {
                    return Err(ProcessingError::JobFailed {
                        job_id,
                        message: page
                            .status_message
                            .unwrap_or_else(|| "no status message".to_string()),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisPayload, DocumentSource, Feature, FeatureSet, JobId};
    use crate::services::{JobPage, ServiceError, ServiceResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed sequence of status responses.
    struct ScriptedStatus {
        statuses: Mutex<VecDeque<ServiceResult<&'static str>>>,
        queries: Mutex<usize>,
    }

    impl ScriptedStatus {
        fn new(statuses: Vec<ServiceResult<&'static str>>) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(statuses.into()),
                queries: Mutex::new(0),
            })
        }

        fn queries(&self) -> usize {
            *self.queries.lock().unwrap()
        }
    }

    #[async_trait]
    impl AnalysisService for ScriptedStatus {
        async fn detect_text(&self, _: &DocumentSource) -> ServiceResult<AnalysisPayload> {
            unreachable!()
        }

        async fn analyze_document(
            &self,
            _: &DocumentSource,
            _: &[Feature],
        ) -> ServiceResult<AnalysisPayload> {
            unreachable!()
        }

        async fn start_text_detection(&self, _: &DocumentSource) -> ServiceResult<JobId> {
            unreachable!()
        }

        async fn start_document_analysis(
            &self,
            _: &DocumentSource,
            _: &[Feature],
        ) -> ServiceResult<JobId> {
            unreachable!()
        }

        async fn get_job_page(
            &self,
            _: &JobId,
            _: AnalysisMode,
            _: Option<&str>,
        ) -> ServiceResult<JobPage> {
            *self.queries.lock().unwrap() += 1;
            let raw = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no more scripted statuses")?;
            Ok(JobPage {
                status: JobStatus::from_service(raw).unwrap(),
                status_message: (raw == "FAILED").then(|| "unreadable document".to_string()),
                payload: AnalysisPayload {
                    job_status: Some(raw.to_string()),
                    ..Default::default()
                },
            })
        }
    }

    fn job() -> Job {
        Job::new(JobId::new("job-1"), FeatureSet::new(true, false, false))
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_succeeded() {
        let service =
            ScriptedStatus::new(vec![Ok("IN_PROGRESS"), Ok("IN_PROGRESS"), Ok("SUCCEEDED")]);
        let poller = JobPoller::new(service.clone());
        let mut job = job();

        poller
            .wait(
                &mut job,
                AnalysisMode::TextDetection,
                &CancellationToken::new(),
                Deadline::unbounded(),
            )
            .await
            .unwrap();

        assert_eq!(job.status(), JobStatus::Succeeded);
        assert_eq!(service.queries(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_job_is_not_queried_again() {
        let service = ScriptedStatus::new(vec![Ok("SUCCEEDED")]);
        let poller = JobPoller::new(service.clone());
        let mut job = job();
        let cancel = CancellationToken::new();

        poller
            .wait(&mut job, AnalysisMode::TextDetection, &cancel, Deadline::unbounded())
            .await
            .unwrap();
        poller
            .wait(&mut job, AnalysisMode::TextDetection, &cancel, Deadline::unbounded())
            .await
            .unwrap();

        assert_eq!(service.queries(), 1);
        assert!(job.transition(JobStatus::InProgress).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_surfaces_message() {
        let service = ScriptedStatus::new(vec![Ok("IN_PROGRESS"), Ok("FAILED")]);
        let poller = JobPoller::new(service.clone());
        let mut job = job();

        let err = poller
            .wait(
                &mut job,
                AnalysisMode::DocumentAnalysis,
                &CancellationToken::new(),
                Deadline::unbounded(),
            )
            .await
            .unwrap_err();

        match err {
            ProcessingError::JobFailed { job_id, message } => {
                assert_eq!(job_id.as_str(), "job-1");
                assert_eq!(message, "unreadable document");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(job.status(), JobStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_status_failure_is_retried() {
        let service = ScriptedStatus::new(vec![
            Ok("IN_PROGRESS"),
            Err(ServiceError::transient("analysis", "connection reset")),
            Ok("SUCCEEDED"),
        ]);
        let poller = JobPoller::new(service.clone());
        let mut job = job();

        poller
            .wait(
                &mut job,
                AnalysisMode::TextDetection,
                &CancellationToken::new(),
                Deadline::unbounded(),
            )
            .await
            .unwrap();

        assert_eq!(job.status(), JobStatus::Succeeded);
        assert_eq!(service.queries(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_times_out() {
        let service = ScriptedStatus::new((0..100).map(|_| Ok("IN_PROGRESS")).collect());
        let poller = JobPoller::new(service.clone());
        let mut job = job();

        let err = poller
            .wait(
                &mut job,
                AnalysisMode::TextDetection,
                &CancellationToken::new(),
                Deadline::after(Some(Duration::from_secs(12))),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessingError::TimedOut(_)));
        assert_eq!(service.queries(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_polling() {
        let service = ScriptedStatus::new((0..10).map(|_| Ok("IN_PROGRESS")).collect());
        let poller = JobPoller::new(service.clone());
        let mut job = job();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = poller
            .wait(&mut job, AnalysisMode::TextDetection, &cancel, Deadline::unbounded())
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessingError::Cancelled));
        assert_eq!(service.queries(), 0);
    }
}
