//! Sequential processing of a list of documents.
//!
//! Each document goes through validation, the job lifecycle and reporting.
//! A failure is recorded and the batch moves on to the next document.
//! Documents are paced through the rate limiter's `documents` key so that
//! the pause is measured from the end of the previous document.

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::analysis::{DocumentProcessor, ProcessingError};
use crate::models::{AnalysisRequest, DocumentSource, FeatureSet};
use crate::output::OutputError;
use crate::rate_limit::{RateLimiter, DOCUMENTS_KEY};
use crate::report::{DocumentReport, Reporter};

/// Why a single document of a batch failed.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error("Failed to write report: {0}")]
    Output(#[from] OutputError),
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<(String, DocumentReport)>,
    pub failed: Vec<(String, DocumentError)>,
    /// Documents never started because the batch was cancelled.
    pub skipped: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped == 0
    }
}

pub struct BatchRunner {
    processor: DocumentProcessor,
    reporter: Reporter,
    limiter: RateLimiter,
    features: FeatureSet,
}

impl BatchRunner {
    pub fn new(
        processor: DocumentProcessor,
        reporter: Reporter,
        limiter: RateLimiter,
        features: FeatureSet,
    ) -> Self {
        Self {
            processor,
            reporter,
            limiter,
            features,
        }
    }

    pub async fn run(
        &self,
        sources: Vec<DocumentSource>,
        cancel: &CancellationToken,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let total = sources.len();

        for (i, source) in sources.into_iter().enumerate() {
            let cancelled = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = self.limiter.acquire(DOCUMENTS_KEY) => false,
            };
            if cancelled {
                summary.skipped = total - i;
                warn!("Batch cancelled, {} documents not processed", summary.skipped);
                break;
            }

            let name = source.name();
            info!("Processing document {}/{}: {}", i + 1, total, source);

            match self.process_one(source, cancel).await {
                Ok(report) => {
                    info!("{}: done ({} pages)", name, report.pages);
                    summary.succeeded.push((name, report));
                }
                Err(e) => {
                    error!("{}: {}", name, e);
                    summary.failed.push((name, e));
                }
            }

            self.limiter.mark_complete(DOCUMENTS_KEY).await;
        }

        summary
    }

    async fn process_one(
        &self,
        source: DocumentSource,
        cancel: &CancellationToken,
    ) -> Result<DocumentReport, DocumentError> {
        let request = AnalysisRequest::load(Some(source), self.features)
            .await
            .map_err(ProcessingError::from)?;
        let results = self.processor.process(&request, cancel).await?;
        let name = request.source().name();
        Ok(self.reporter.report(&name, &results).await?)
    }
}
