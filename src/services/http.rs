//! JSON-over-HTTP gateway client for all remote collaborators.
//!
//! Every operation is a POST to `{endpoint}/{service}/{operation}` with a
//! PascalCase JSON body. Responses are decoded into wire types and mapped to
//! the domain models. Status codes are classified so callers can tell
//! retryable failures from rejections.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    AnalysisMode, AnalysisService, JobPage, LanguageService, MedicalService, ServiceError,
    ServiceResult, TranslationService,
};
use crate::models::{
    AnalysisPayload, DocumentSource, Feature, JobId, JobStatus, KeyPhrase, MedicalEntity,
    NamedEntity, PhiSpan, Sentiment, SentimentScore, SyntaxToken,
};
use crate::rate_limit::{parse_retry_after, RateLimiter};

const ANALYSIS: &str = "analysis";
const LANGUAGE: &str = "language";
const MEDICAL: &str = "medical";
const TRANSLATION: &str = "translation";

/// Connection settings for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL, without trailing slash.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub region: String,
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            api_key: None,
            region: "us-east-1".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// HTTP client implementing every service trait.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    config: GatewayConfig,
    limiter: Option<RateLimiter>,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ServiceError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: GatewayConfig {
                endpoint: config.endpoint.trim_end_matches('/').to_string(),
                ..config
            },
            limiter: None,
        })
    }

    /// Pace calls per service and feed throttling responses back into `limiter`.
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn url(&self, service: &str, operation: &str) -> String {
        format!("{}/{}/{}", self.config.endpoint, service, operation)
    }

    async fn call<B, R>(&self, service: &str, operation: &str, body: &B) -> ServiceResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        if let Some(limiter) = &self.limiter {
            limiter.acquire(service).await;
        }

        let url = self.url(service, operation);
        debug!("POST {}", url);

        let mut request = self
            .client
            .post(&url)
            .header("x-region", &self.config.region)
            .json(body);
        if let Some(key) = &self.config.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::transient(service, format!("{} failed: {}", operation, e)))?;

        let status = response.status();

        if status.is_success() {
            if let Some(limiter) = &self.limiter {
                limiter.report_success(service).await;
            }
            let bytes = response.bytes().await.map_err(|e| {
                ServiceError::transient(service, format!("Reading body failed: {}", e))
            })?;
            return decode(service, operation, &bytes);
        }

        let retry_after = parse_retry_after(
            response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
        );
        let text = response.text().await.unwrap_or_default();
        let err = classify_failure(service, operation, status, retry_after, &text);

        if let Some(limiter) = &self.limiter {
            match &err {
                ServiceError::Throttled { retry_after, .. } => {
                    limiter.report_throttled(service, *retry_after).await
                }
                ServiceError::Transient { .. } => limiter.report_server_error(service).await,
                _ => {}
            }
        }
        Err(err)
    }
}

/// Map a non-success status to an error: 429 is throttling, 5xx is
/// transient, anything else is a rejection carrying the response body.
fn classify_failure(
    service: &str,
    operation: &str,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> ServiceError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        ServiceError::Throttled {
            service: service.to_string(),
            retry_after,
        }
    } else if status.is_server_error() {
        ServiceError::transient(service, format!("{} returned {}: {}", operation, status, body))
    } else {
        ServiceError::Rejected {
            service: service.to_string(),
            status: status.as_u16(),
            message: body.to_string(),
        }
    }
}

fn decode<R: DeserializeOwned>(service: &str, operation: &str, bytes: &[u8]) -> ServiceResult<R> {
    serde_json::from_slice(bytes)
        .map_err(|e| ServiceError::invalid(service, format!("{} response: {}", operation, e)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct S3Object<'a> {
    bucket: &'a str,
    name: &'a str,
}

/// Document reference as sent on the wire: inline base64 bytes or an
/// object-storage location.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct WireDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    s3_object: Option<S3Object<'a>>,
}

/// Local files are read into `InlineBytes` when the request is built, so a
/// path never goes over the wire.
fn wire_document(source: &DocumentSource) -> ServiceResult<WireDocument<'_>> {
    match source {
        DocumentSource::InlineBytes { bytes, .. } => Ok(WireDocument {
            bytes: Some(general_purpose::STANDARD.encode(bytes)),
            s3_object: None,
        }),
        DocumentSource::LocalFile(path) => Err(ServiceError::Unavailable(format!(
            "{} was not loaded into the request",
            path.display()
        ))),
        DocumentSource::ObjectRef { bucket, key } => Ok(WireDocument {
            bytes: None,
            s3_object: Some(S3Object { bucket, name: key }),
        }),
    }
}

fn feature_names(features: &[Feature]) -> Vec<&'static str> {
    features.iter().map(Feature::as_str).collect()
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DocumentRequest<'a> {
    document: WireDocument<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    feature_types: Vec<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartJobRequest<'a> {
    document_location: WireDocument<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    feature_types: Vec<&'static str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartJobResponse {
    job_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetJobRequest<'a> {
    job_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[async_trait]
impl AnalysisService for GatewayClient {
    async fn detect_text(&self, source: &DocumentSource) -> ServiceResult<AnalysisPayload> {
        let body = DocumentRequest {
            document: wire_document(source)?,
            feature_types: Vec::new(),
        };
        self.call(ANALYSIS, "detect_document_text", &body).await
    }

    async fn analyze_document(
        &self,
        source: &DocumentSource,
        features: &[Feature],
    ) -> ServiceResult<AnalysisPayload> {
        let body = DocumentRequest {
            document: wire_document(source)?,
            feature_types: feature_names(features),
        };
        self.call(ANALYSIS, "analyze_document", &body).await
    }

    async fn start_text_detection(&self, source: &DocumentSource) -> ServiceResult<JobId> {
        let body = StartJobRequest {
            document_location: wire_document(source)?,
            feature_types: Vec::new(),
        };
        let resp: StartJobResponse = self
            .call(ANALYSIS, "start_document_text_detection", &body)
            .await?;
        Ok(JobId::new(resp.job_id))
    }

    async fn start_document_analysis(
        &self,
        source: &DocumentSource,
        features: &[Feature],
    ) -> ServiceResult<JobId> {
        let body = StartJobRequest {
            document_location: wire_document(source)?,
            feature_types: feature_names(features),
        };
        let resp: StartJobResponse = self
            .call(ANALYSIS, "start_document_analysis", &body)
            .await?;
        Ok(JobId::new(resp.job_id))
    }

    async fn get_job_page(
        &self,
        job_id: &JobId,
        mode: AnalysisMode,
        next_token: Option<&str>,
    ) -> ServiceResult<JobPage> {
        let operation = match mode {
            AnalysisMode::TextDetection => "get_document_text_detection",
            AnalysisMode::DocumentAnalysis => "get_document_analysis",
        };
        let body = GetJobRequest {
            job_id: job_id.as_str(),
            next_token,
        };
        let payload: AnalysisPayload = self.call(ANALYSIS, operation, &body).await?;

        let raw_status = payload
            .job_status
            .as_deref()
            .ok_or_else(|| ServiceError::invalid(ANALYSIS, "response has no JobStatus"))?;
        let status = JobStatus::from_service(raw_status).ok_or_else(|| {
            ServiceError::invalid(ANALYSIS, format!("unknown JobStatus '{}'", raw_status))
        })?;

        Ok(JobPage {
            status,
            status_message: payload.status_message.clone(),
            payload,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TextRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language_code: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireSentimentScore {
    positive: f64,
    negative: f64,
    neutral: f64,
    mixed: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SentimentResponse {
    sentiment: Sentiment,
    sentiment_score: WireSentimentScore,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PartOfSpeech {
    tag: String,
    score: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireSyntaxToken {
    text: String,
    begin_offset: usize,
    end_offset: usize,
    part_of_speech: PartOfSpeech,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SyntaxResponse {
    #[serde(default)]
    syntax_tokens: Vec<WireSyntaxToken>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireEntity {
    #[serde(rename = "Type")]
    entity_type: String,
    text: String,
    score: f64,
    begin_offset: usize,
    end_offset: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EntitiesResponse {
    #[serde(default)]
    entities: Vec<WireEntity>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireKeyPhrase {
    text: String,
    score: f64,
    begin_offset: usize,
    end_offset: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KeyPhrasesResponse {
    #[serde(default)]
    key_phrases: Vec<WireKeyPhrase>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireTrait {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireMedicalEntity {
    text: String,
    #[serde(rename = "Type")]
    entity_type: String,
    category: String,
    score: f64,
    begin_offset: usize,
    end_offset: usize,
    #[serde(default)]
    traits: Vec<WireTrait>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MedicalEntitiesResponse {
    #[serde(default)]
    entities: Vec<WireMedicalEntity>,
}

#[async_trait]
impl LanguageService for GatewayClient {
    async fn sentiment(&self, text: &str, language: &str) -> ServiceResult<SentimentScore> {
        let body = TextRequest {
            text,
            language_code: Some(language),
        };
        let resp: SentimentResponse = self.call(LANGUAGE, "detect_sentiment", &body).await?;
        Ok(SentimentScore {
            sentiment: resp.sentiment,
            positive: resp.sentiment_score.positive,
            negative: resp.sentiment_score.negative,
            neutral: resp.sentiment_score.neutral,
            mixed: resp.sentiment_score.mixed,
        })
    }

    async fn syntax(&self, text: &str, language: &str) -> ServiceResult<Vec<SyntaxToken>> {
        let body = TextRequest {
            text,
            language_code: Some(language),
        };
        let resp: SyntaxResponse = self.call(LANGUAGE, "detect_syntax", &body).await?;
        Ok(resp
            .syntax_tokens
            .into_iter()
            .map(|t| SyntaxToken {
                tag: t.part_of_speech.tag,
                score: t.part_of_speech.score,
                text: t.text,
                begin_offset: t.begin_offset,
                end_offset: t.end_offset,
            })
            .collect())
    }

    async fn entities(&self, text: &str, language: &str) -> ServiceResult<Vec<NamedEntity>> {
        let body = TextRequest {
            text,
            language_code: Some(language),
        };
        let resp: EntitiesResponse = self.call(LANGUAGE, "detect_entities", &body).await?;
        Ok(resp
            .entities
            .into_iter()
            .map(|e| NamedEntity {
                entity_type: e.entity_type,
                text: e.text,
                score: e.score,
                begin_offset: e.begin_offset,
                end_offset: e.end_offset,
            })
            .collect())
    }

    async fn key_phrases(&self, text: &str, language: &str) -> ServiceResult<Vec<KeyPhrase>> {
        let body = TextRequest {
            text,
            language_code: Some(language),
        };
        let resp: KeyPhrasesResponse = self.call(LANGUAGE, "detect_key_phrases", &body).await?;
        Ok(resp
            .key_phrases
            .into_iter()
            .map(|k| KeyPhrase {
                text: k.text,
                score: k.score,
                begin_offset: k.begin_offset,
                end_offset: k.end_offset,
            })
            .collect())
    }
}

#[async_trait]
impl MedicalService for GatewayClient {
    async fn medical_entities(&self, text: &str) -> ServiceResult<Vec<MedicalEntity>> {
        let body = TextRequest {
            text,
            language_code: None,
        };
        let resp: MedicalEntitiesResponse = self.call(MEDICAL, "detect_entities", &body).await?;
        Ok(resp
            .entities
            .into_iter()
            .map(|e| MedicalEntity {
                text: e.text,
                entity_type: e.entity_type,
                category: e.category,
                score: e.score,
                begin_offset: e.begin_offset,
                end_offset: e.end_offset,
            })
            .collect())
    }

    async fn phi(&self, text: &str) -> ServiceResult<Vec<PhiSpan>> {
        let body = TextRequest {
            text,
            language_code: None,
        };
        let resp: MedicalEntitiesResponse = self.call(MEDICAL, "detect_phi", &body).await?;
        Ok(resp
            .entities
            .into_iter()
            .map(|e| PhiSpan {
                text: e.text,
                entity_type: e.entity_type,
                category: e.category,
                score: e.score,
                begin_offset: e.begin_offset,
                end_offset: e.end_offset,
                traits: e.traits.into_iter().map(|t| t.name).collect(),
            })
            .collect())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TranslateRequest<'a> {
    text: &'a str,
    source_language_code: &'a str,
    target_language_code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TranslateResponse {
    translated_text: String,
}

#[async_trait]
impl TranslationService for GatewayClient {
    async fn translate(&self, text: &str, source: &str, target: &str) -> ServiceResult<String> {
        let body = TranslateRequest {
            text,
            source_language_code: source,
            target_language_code: target,
        };
        let resp: TranslateResponse = self.call(TRANSLATION, "translate_text", &body).await?;
        Ok(resp.translated_text)
    }
}
