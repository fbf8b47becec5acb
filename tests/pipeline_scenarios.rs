//! End-to-end pipeline scenarios against scripted collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use docinsight::analysis::{DocumentProcessor, ProcessingError, ProcessorOptions};
use docinsight::batch::{BatchRunner, DocumentError};
use docinsight::document::Document;
use docinsight::insights::{
    Extractor, InsightAggregator, InsightChunker, InsightOptions, InsightServices,
};
use docinsight::models::{
    AnalysisPayload, AnalysisRequest, DocumentSource, Feature, FeatureSet, InsightCategory,
    JobId, JobStatus, KeyPhrase, MedicalEntity, NamedEntity, PhiSpan, RequestError, Sentiment,
    SentimentScore, SyntaxToken,
};
use docinsight::output::FileReportEmitter;
use docinsight::rate_limit::{InMemoryRateLimitBackend, RateLimitConfig, RateLimiter};
use docinsight::report::Reporter;
use docinsight::services::{
    AnalysisMode, AnalysisService, JobPage, LanguageService, MedicalService, ServiceError,
    ServiceResult,
};

fn payload(json: &str) -> AnalysisPayload {
    serde_json::from_str(json).unwrap()
}

/// A claim form whose key is in the first result page and whose value only
/// arrives in the third.
fn claim_pages() -> Vec<AnalysisPayload> {
    vec![
        payload(
            r#"{"JobStatus": "SUCCEEDED", "NextToken": "T1", "Blocks": [
                {"Id": "p1", "BlockType": "PAGE"},
                {"Id": "l1", "BlockType": "LINE", "Text": "Policy: 12345",
                 "Relationships": [{"Type": "CHILD", "Ids": ["w1", "w2"]}]},
                {"Id": "w1", "BlockType": "WORD", "Text": "Policy:"},
                {"Id": "k1", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["KEY"],
                 "Relationships": [{"Type": "CHILD", "Ids": ["w1"]}, {"Type": "VALUE", "Ids": ["v1"]}]}
            ]}"#,
        ),
        payload(
            r#"{"JobStatus": "SUCCEEDED", "NextToken": "T2", "Blocks": [
                {"Id": "w2", "BlockType": "WORD", "Text": "12345"}
            ]}"#,
        ),
        payload(
            r#"{"JobStatus": "SUCCEEDED", "Blocks": [
                {"Id": "v1", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["VALUE"],
                 "Relationships": [{"Type": "CHILD", "Ids": ["w2"]}]},
                {"Id": "p2", "BlockType": "PAGE"},
                {"Id": "l2", "BlockType": "LINE", "Text": "Signed by Jane Roe"}
            ]}"#,
        ),
    ]
}

/// Asynchronous job that reports the scripted statuses, then serves
/// `claim_pages` through tokens T1 and T2.
struct ScriptedJob {
    statuses: Mutex<VecDeque<&'static str>>,
    pages: Vec<AnalysisPayload>,
    status_queries: AtomicUsize,
    tokens: Mutex<Vec<Option<String>>>,
    starts: AtomicUsize,
}

impl ScriptedJob {
    fn new(statuses: &[&'static str]) -> Self {
        Self {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            pages: claim_pages(),
            status_queries: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
            starts: AtomicUsize::new(0),
        }
    }

    fn total_calls(&self) -> usize {
        self.starts.load(Ordering::SeqCst) + self.tokens.lock().unwrap().len()
    }
}

#[async_trait]
impl AnalysisService for ScriptedJob {
    async fn detect_text(&self, _: &DocumentSource) -> ServiceResult<AnalysisPayload> {
        unreachable!("documents in object storage are analyzed asynchronously")
    }

    async fn analyze_document(
        &self,
        _: &DocumentSource,
        _: &[Feature],
    ) -> ServiceResult<AnalysisPayload> {
        unreachable!("documents in object storage are analyzed asynchronously")
    }

    async fn start_text_detection(&self, _: &DocumentSource) -> ServiceResult<JobId> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(JobId::new("job-text"))
    }

    async fn start_document_analysis(
        &self,
        _: &DocumentSource,
        features: &[Feature],
    ) -> ServiceResult<JobId> {
        assert_eq!(features, &[Feature::Forms]);
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(JobId::new("job-analysis"))
    }

    async fn get_job_page(
        &self,
        _: &JobId,
        _: AnalysisMode,
        next_token: Option<&str>,
    ) -> ServiceResult<JobPage> {
        self.tokens
            .lock()
            .unwrap()
            .push(next_token.map(str::to_string));

        if next_token.is_none() {
            if let Some(status) = self.statuses.lock().unwrap().pop_front() {
                self.status_queries.fetch_add(1, Ordering::SeqCst);
                let status = JobStatus::from_service(status).unwrap();
                return Ok(JobPage {
                    status,
                    status_message: (status == JobStatus::Failed)
                        .then(|| "unreadable document".to_string()),
                    payload: if status == JobStatus::Succeeded {
                        self.pages[0].clone()
                    } else {
                        AnalysisPayload::default()
                    },
                });
            }
        }

        let index = match next_token {
            None => 0,
            Some("T1") => 1,
            Some("T2") => 2,
            Some(other) => panic!("unknown token {}", other),
        };
        Ok(JobPage {
            status: JobStatus::Succeeded,
            status_message: None,
            payload: self.pages[index].clone(),
        })
    }
}

fn claim_request(features: FeatureSet) -> AnalysisRequest {
    AnalysisRequest::new(
        Some(DocumentSource::ObjectRef {
            bucket: "claims".to_string(),
            key: "2019/intake.pdf".to_string(),
        }),
        features,
    )
    .unwrap()
}

fn options() -> ProcessorOptions {
    ProcessorOptions {
        poll_interval: Duration::from_secs(5),
        poll_timeout: Some(Duration::from_secs(1800)),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn async_job_polls_until_succeeded_then_paginates() {
    let service = Arc::new(ScriptedJob::new(&["IN_PROGRESS", "IN_PROGRESS", "SUCCEEDED"]));
    let processor = DocumentProcessor::new(service.clone(), options());

    let results = processor
        .process(
            &claim_request(FeatureSet::new(false, true, false)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(service.status_queries.load(Ordering::SeqCst), 3);
    assert_eq!(
        *service.tokens.lock().unwrap(),
        vec![
            None,
            None,
            None,
            None,
            Some("T1".to_string()),
            Some("T2".to_string()),
        ]
    );

    let ordinals: Vec<usize> = results.pages().iter().map(|p| p.ordinal).collect();
    assert_eq!(ordinals, vec![0, 1, 2]);
    assert!(results.is_complete());
}

#[tokio::test(start_paused = true)]
async fn form_value_resolved_across_result_pages() {
    let service = Arc::new(ScriptedJob::new(&["SUCCEEDED"]));
    let processor = DocumentProcessor::new(service, options());

    let results = processor
        .process(
            &claim_request(FeatureSet::new(false, true, false)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    let document = Document::from_result_set(&results);

    assert_eq!(document.pages().len(), 2);
    let field = document.pages()[0].form().field_by_key("Policy:").unwrap();
    assert_eq!(field.value_text(), "12345");
    assert_eq!(document.pages()[1].text(), "Signed by Jane Roe\n");
}

#[tokio::test(start_paused = true)]
async fn failed_job_reports_message_without_results() {
    let service = Arc::new(ScriptedJob::new(&["IN_PROGRESS", "FAILED"]));
    let processor = DocumentProcessor::new(service.clone(), options());

    let err = processor
        .process(
            &claim_request(FeatureSet::new(true, false, false)),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match err {
        ProcessingError::JobFailed { job_id, message } => {
            assert_eq!(job_id.as_str(), "job-text");
            assert_eq!(message, "unreadable document");
        }
        other => panic!("expected JobFailed, got {:?}", other),
    }
    assert_eq!(service.tokens.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn job_that_never_finishes_times_out() {
    let statuses = vec!["IN_PROGRESS"; 1000];
    let service = Arc::new(ScriptedJob::new(&statuses));
    let processor = DocumentProcessor::new(
        service.clone(),
        ProcessorOptions {
            poll_timeout: Some(Duration::from_secs(60)),
            ..options()
        },
    );

    let err = processor
        .process(
            &claim_request(FeatureSet::new(true, false, false)),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessingError::TimedOut(d) if d == Duration::from_secs(60)));
    assert!(service.status_queries.load(Ordering::SeqCst) <= 12);
}

/// Reports one entity at local (10, 15) for every segment.
#[derive(Default)]
struct FixedEntityLanguage {
    calls: AtomicUsize,
}

#[async_trait]
impl LanguageService for FixedEntityLanguage {
    async fn sentiment(&self, _: &str, _: &str) -> ServiceResult<SentimentScore> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SentimentScore {
            sentiment: Sentiment::Neutral,
            positive: 0.0,
            negative: 0.0,
            neutral: 1.0,
            mixed: 0.0,
        })
    }

    async fn syntax(&self, _: &str, _: &str) -> ServiceResult<Vec<SyntaxToken>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn entities(&self, _: &str, _: &str) -> ServiceResult<Vec<NamedEntity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![NamedEntity {
            entity_type: "PERSON".to_string(),
            text: "Smith".to_string(),
            score: 0.99,
            begin_offset: 10,
            end_offset: 15,
        }])
    }

    async fn key_phrases(&self, _: &str, _: &str) -> ServiceResult<Vec<KeyPhrase>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Entity recognition is rejected; PHI detection works.
struct EntitiesRejected;

#[async_trait]
impl MedicalService for EntitiesRejected {
    async fn medical_entities(&self, _: &str) -> ServiceResult<Vec<MedicalEntity>> {
        Err(ServiceError::Rejected {
            service: "medical".to_string(),
            status: 400,
            message: "text too long".to_string(),
        })
    }

    async fn phi(&self, _: &str) -> ServiceResult<Vec<PhiSpan>> {
        Ok(vec![PhiSpan {
            text: "Jane Roe".to_string(),
            entity_type: "NAME".to_string(),
            category: "PROTECTED_HEALTH_INFORMATION".to_string(),
            score: 0.97,
            begin_offset: 10,
            end_offset: 18,
            traits: Vec::new(),
        }])
    }
}

fn general_aggregator(language: Arc<FixedEntityLanguage>, max_len: usize) -> InsightAggregator {
    let services = InsightServices {
        language: Some(language),
        ..Default::default()
    };
    let options = InsightOptions {
        general: true,
        ..Default::default()
    };
    InsightAggregator::new(
        InsightChunker::new(max_len).unwrap(),
        Extractor::resolve(&options, &services).unwrap(),
    )
}

#[tokio::test]
async fn long_page_offsets_are_global() {
    let language = Arc::new(FixedEntityLanguage::default());
    let aggregator = general_aggregator(language.clone(), 2000);
    let text = "x".repeat(4500);

    let report = aggregator.analyze_page(1, &text).await;

    let spans: Vec<(usize, usize)> = report
        .entities
        .iter()
        .map(|e| (e.begin_offset, e.end_offset))
        .collect();
    assert_eq!(spans, vec![(10, 15), (2010, 2015), (4010, 4015)]);
    assert_eq!(report.sentiment.len(), 3);
    assert_eq!(language.calls.load(Ordering::SeqCst), 12);
}

#[tokio::test]
async fn empty_page_issues_no_calls() {
    let language = Arc::new(FixedEntityLanguage::default());
    let aggregator = general_aggregator(language.clone(), 2000);

    let report = aggregator.analyze_page(3, "").await;

    assert!(report.is_empty());
    assert_eq!(report.page_number, 3);
    assert_eq!(language.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_category_leaves_other_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let services = InsightServices {
        medical: Some(Arc::new(EntitiesRejected)),
        ..Default::default()
    };
    let options = InsightOptions {
        medical: true,
        ..Default::default()
    };
    let aggregator = InsightAggregator::new(
        InsightChunker::default(),
        Extractor::resolve(&options, &services).unwrap(),
    );
    let reporter = Reporter::new(
        aggregator,
        Arc::new(FileReportEmitter::new(dir.path())),
        FeatureSet::new(true, true, false),
    );
    let results = claim_pages().into_iter().collect();

    let report = reporter.report("intake.pdf", &results).await.unwrap();

    assert_eq!(report.pages, 2);
    assert_eq!(report.failure_count(), 2);
    assert!(report
        .insights
        .iter()
        .all(|p| p.failed(InsightCategory::MedicalEntities)));

    let out = dir.path();
    assert!(out.join("intake-pdf-response.json").exists());
    assert!(out.join("intake-pdf-page-1-forms.csv").exists());
    assert!(out.join("intake-pdf-page-2-medical-insights-phi.json").exists());
    assert!(!out
        .join("intake-pdf-page-1-medical-insights-entities.csv")
        .exists());

    let forms = std::fs::read_to_string(out.join("intake-pdf-page-1-forms.csv")).unwrap();
    assert_eq!(
        forms,
        "Key,KeyConfidence,Value,ValueConfidence\r\nPolicy:,,12345,\r\n"
    );
}

#[tokio::test]
async fn invalid_documents_fail_before_any_remote_call() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(ScriptedJob::new(&[]));
    let features = FeatureSet::new(true, false, false);
    let runner = BatchRunner::new(
        DocumentProcessor::new(service.clone(), options()),
        Reporter::new(
            InsightAggregator::new(InsightChunker::default(), Vec::new()),
            Arc::new(FileReportEmitter::new(dir.path())),
            features,
        ),
        RateLimiter::with_config(
            Arc::new(InMemoryRateLimitBackend::new()),
            RateLimitConfig::fixed(Duration::ZERO),
        ),
        features,
    );

    let summary = runner
        .run(
            vec![
                DocumentSource::InlineBytes {
                    name: "report.pdf".to_string(),
                    bytes: b"%PDF-1.7".to_vec(),
                },
                DocumentSource::ObjectRef {
                    bucket: "claims".to_string(),
                    key: "notes.docx".to_string(),
                },
            ],
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(summary.failed.len(), 2);
    assert!(matches!(
        summary.failed[0].1,
        DocumentError::Processing(ProcessingError::Request(RequestError::ObjectStoreRequired))
    ));
    assert!(matches!(
        summary.failed[1].1,
        DocumentError::Processing(ProcessingError::Request(
            RequestError::UnsupportedDocumentType(_)
        ))
    ));
    assert_eq!(service.total_calls(), 0);
}
