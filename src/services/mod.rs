//! Remote collaborator contracts.
//!
//! The orchestrator and the insight pipeline only talk to these traits.
//! Concrete clients are constructed once and passed in as `Arc<dyn …>`
//! handles, so tests can substitute scripted implementations.

mod error;
pub mod http;

use async_trait::async_trait;

use crate::models::{
    AnalysisPayload, DocumentSource, Feature, JobId, JobStatus, KeyPhrase, MedicalEntity,
    NamedEntity, PhiSpan, SentimentScore, SyntaxToken,
};

pub use error::{ServiceError, ServiceResult};
pub use http::{GatewayClient, GatewayConfig};

/// Which analysis operation family a job belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Plain text detection.
    TextDetection,
    /// Feature-aware analysis (forms and/or tables).
    DocumentAnalysis,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::TextDetection => "text_detection",
            AnalysisMode::DocumentAnalysis => "document_analysis",
        }
    }
}

/// One status/result response for an asynchronous job.
#[derive(Debug, Clone)]
pub struct JobPage {
    pub status: JobStatus,
    pub status_message: Option<String>,
    pub payload: AnalysisPayload,
}

impl JobPage {
    pub fn next_token(&self) -> Option<&str> {
        self.payload.next_token.as_deref()
    }
}

/// Document layout analysis service.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Synchronous plain-text detection of a single image.
    async fn detect_text(&self, source: &DocumentSource) -> ServiceResult<AnalysisPayload>;

    /// Synchronous feature-aware analysis of a single image.
    async fn analyze_document(
        &self,
        source: &DocumentSource,
        features: &[Feature],
    ) -> ServiceResult<AnalysisPayload>;

    /// Start an asynchronous text detection job.
    async fn start_text_detection(&self, source: &DocumentSource) -> ServiceResult<JobId>;

    /// Start an asynchronous feature-aware analysis job.
    async fn start_document_analysis(
        &self,
        source: &DocumentSource,
        features: &[Feature],
    ) -> ServiceResult<JobId>;

    /// Query a job. Without a token this reports status and the first result
    /// page; with a token it returns the page the token points at.
    async fn get_job_page(
        &self,
        job_id: &JobId,
        mode: AnalysisMode,
        next_token: Option<&str>,
    ) -> ServiceResult<JobPage>;
}

/// General-language NLP service.
#[async_trait]
pub trait LanguageService: Send + Sync {
    async fn sentiment(&self, text: &str, language: &str) -> ServiceResult<SentimentScore>;

    async fn syntax(&self, text: &str, language: &str) -> ServiceResult<Vec<SyntaxToken>>;

    async fn entities(&self, text: &str, language: &str) -> ServiceResult<Vec<NamedEntity>>;

    async fn key_phrases(&self, text: &str, language: &str) -> ServiceResult<Vec<KeyPhrase>>;
}

/// Clinical NLP service.
#[async_trait]
pub trait MedicalService: Send + Sync {
    async fn medical_entities(&self, text: &str) -> ServiceResult<Vec<MedicalEntity>>;

    async fn phi(&self, text: &str) -> ServiceResult<Vec<PhiSpan>>;
}

/// Machine translation service.
#[async_trait]
pub trait TranslationService: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> ServiceResult<String>;
}
