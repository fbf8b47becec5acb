//! Data models for docinsight.

mod block;
mod insight;
mod job;
mod request;
mod result_set;

pub use block::{AnalysisPayload, Block, BlockType, DocumentMetadata, Relationship};
pub use insight::{
    Anchored, CategoryFailure, InsightCategory, KeyPhrase, MedicalEntity, NamedEntity,
    PageInsightReport, PhiSpan, Sentiment, SentimentScore, SyntaxToken, TextSegment,
};
pub use job::{Job, JobId, JobStatus, JobTransitionError};
pub use request::{
    AnalysisRequest, DocumentKind, DocumentSource, Feature, FeatureSet, RequestError,
};
pub use result_set::{ResultPage, ResultSet};
