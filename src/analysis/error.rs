//! Document-level processing errors.

use std::time::Duration;

use thiserror::Error;

use crate::models::{JobId, JobTransitionError, RequestError};
use crate::services::ServiceError;

/// Failures that abort processing of one document.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Invalid request: {0}")]
    Request(#[from] RequestError),

    #[error("Failed to submit {document}: {source}")]
    SubmitFailed {
        document: String,
        #[source]
        source: ServiceError,
    },

    #[error("Status query for job {job_id} failed: {source}")]
    StatusQueryFailed {
        job_id: JobId,
        #[source]
        source: ServiceError,
    },

    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: JobId, message: String },

    #[error("Fetching results of job {job_id} failed: {source}")]
    ResultFetchFailed {
        job_id: JobId,
        #[source]
        source: ServiceError,
    },

    #[error(transparent)]
    InvalidTransition(#[from] JobTransitionError),

    #[error("Processing cancelled")]
    Cancelled,

    #[error("Job did not finish within {0:?}")]
    TimedOut(Duration),
}
