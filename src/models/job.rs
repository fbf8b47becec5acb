//! Asynchronous analysis jobs and their lifecycle.

use std::fmt;

use thiserror::Error;

use super::FeatureSet;

/// Opaque server-side job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of an asynchronous job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Start call accepted, no status observed yet.
    Submitted,
    /// Service reports the job is still running.
    InProgress,
    /// Terminal: results are available.
    Succeeded,
    /// Terminal: the service gave up on the job.
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Parse a status string as reported by the analysis service.
    ///
    /// `PARTIAL_SUCCESS` still yields result pages and is treated as success.
    pub fn from_service(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SUBMITTED" => Some(JobStatus::Submitted),
            "IN_PROGRESS" => Some(JobStatus::InProgress),
            "SUCCEEDED" | "PARTIAL_SUCCESS" => Some(JobStatus::Succeeded),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Submitted, JobStatus::InProgress) => true,
            (JobStatus::Submitted | JobStatus::InProgress, JobStatus::Succeeded) => true,
            (JobStatus::Submitted | JobStatus::InProgress, JobStatus::Failed) => true,
            (JobStatus::InProgress, JobStatus::InProgress) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Job {job_id} cannot move from {from} to {to}")]
pub struct JobTransitionError {
    pub job_id: JobId,
    pub from: JobStatus,
    pub to: JobStatus,
}

/// An asynchronous analysis job.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    status: JobStatus,
    features: FeatureSet,
}

impl Job {
    pub fn new(id: JobId, features: FeatureSet) -> Self {
        Self {
            id,
            status: JobStatus::Submitted,
            features,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn features(&self) -> FeatureSet {
        self.features
    }

    /// Apply an observed status. Terminal jobs never change again.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), JobTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(JobTransitionError {
                job_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
