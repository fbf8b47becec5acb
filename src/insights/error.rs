use thiserror::Error;

use crate::models::InsightCategory;
use crate::services::ServiceError;

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("Segment length must be greater than zero")]
    InvalidSegmentLength,

    #[error("No {0} service configured")]
    MissingCollaborator(&'static str),

    #[error("{category} extraction failed: {source}")]
    Extraction {
        category: InsightCategory,
        #[source]
        source: ServiceError,
    },
}
