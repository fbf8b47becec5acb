//! Initial submission of a validated analysis request.

use std::sync::Arc;

use tracing::info;

use super::{ProcessingError, RetryPolicy};
use crate::models::{AnalysisRequest, Job, ResultSet};
use crate::services::{AnalysisMode, AnalysisService};

/// Outcome of submitting a request.
#[derive(Debug)]
pub enum Submission {
    /// Synchronous analysis returned the whole result.
    Complete(ResultSet),
    /// An asynchronous job was started and must be polled.
    Started { job: Job, mode: AnalysisMode },
}

/// Chooses synchronous vs asynchronous processing and plain text detection
/// vs feature-aware analysis, then issues the first call.
pub struct JobSubmitter {
    service: Arc<dyn AnalysisService>,
    retry: RetryPolicy,
}

impl JobSubmitter {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self {
            service,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn submit(&self, request: &AnalysisRequest) -> Result<Submission, ProcessingError> {
        let source = request.source();
        let features = request.features();
        let flags = features.analysis_features();
        let mode = if features.needs_analysis() {
            AnalysisMode::DocumentAnalysis
        } else {
            AnalysisMode::TextDetection
        };
        let submit_failed = |source| ProcessingError::SubmitFailed {
            document: request.source().to_string(),
            source,
        };

        if !request.kind().is_async() {
            info!("Analyzing {} synchronously ({})", source, mode.as_str());
            let payload = self
                .retry
                .run("Synchronous analysis", || match mode {
                    AnalysisMode::TextDetection => self.service.detect_text(source),
                    AnalysisMode::DocumentAnalysis => self.service.analyze_document(source, &flags),
                })
                .await
                .map_err(submit_failed)?;
            return Ok(Submission::Complete(ResultSet::single(payload)));
        }

        let job_id = self
            .retry
            .run("Job submission", || match mode {
                AnalysisMode::TextDetection => self.service.start_text_detection(source),
                AnalysisMode::DocumentAnalysis => {
                    self.service.start_document_analysis(source, &flags)
                }
            })
            .await
            .map_err(submit_failed)?;

        info!("Started {} job {} for {}", mode.as_str(), job_id, source);
        Ok(Submission::Started {
            job: Job::new(job_id, features),
            mode,
        })
    }
}
