//! Errors shared by all remote collaborators.

use std::time::Duration;

use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from remote service calls.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Network failure, timeout or 5xx. Worth retrying.
    #[error("Transient failure calling {service}: {message}")]
    Transient { service: String, message: String },

    /// The service asked us to slow down.
    #[error("Throttled by {service}, retry after {retry_after:?}")]
    Throttled {
        service: String,
        retry_after: Option<Duration>,
    },

    /// The service rejected the request (4xx other than throttling).
    #[error("{service} rejected request (HTTP {status}): {message}")]
    Rejected {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {service}: {message}")]
    InvalidResponse { service: String, message: String },

    #[error("Service not available: {0}")]
    Unavailable(String),
}

impl ServiceError {
    /// Whether a retry of the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::Transient { .. } | ServiceError::Throttled { .. }
        )
    }

    /// Server-requested delay, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ServiceError::Throttled { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn transient(service: &str, message: impl Into<String>) -> Self {
        ServiceError::Transient {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid(service: &str, message: impl Into<String>) -> Self {
        ServiceError::InvalidResponse {
            service: service.to_string(),
            message: message.into(),
        }
    }
}
