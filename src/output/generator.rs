//! Layout and insight artifacts for one document.

use std::sync::Arc;

use tracing::{info, warn};

use super::{artifact_base_name, OutputError, ReportEmitter};
use crate::document::{Document, Page};
use crate::models::{FeatureSet, InsightCategory, PageInsightReport, ResultSet};

fn confidence(value: Option<f64>) -> String {
    value.map(|c| c.to_string()).unwrap_or_default()
}

/// Writes the artifacts of one document through a [`ReportEmitter`].
pub struct OutputGenerator {
    emitter: Arc<dyn ReportEmitter>,
    base: String,
    features: FeatureSet,
}

impl OutputGenerator {
    /// `document` is the source name; artifacts are named after its stem and
    /// extension.
    pub fn new(emitter: Arc<dyn ReportEmitter>, document: &str, features: FeatureSet) -> Self {
        Self {
            emitter,
            base: artifact_base_name(document),
            features,
        }
    }

    pub fn base_name(&self) -> &str {
        &self.base
    }

    fn page_name(&self, page: usize, artifact: &str) -> String {
        format!("{}-page-{}-{}", self.base, page, artifact)
    }

    /// Whole response, then per page: blocks, words, text and, when
    /// requested, forms and tables.
    pub async fn write_layout(
        &self,
        results: &ResultSet,
        document: &Document,
    ) -> Result<(), OutputError> {
        if document.is_empty() {
            return Ok(());
        }

        self.emitter
            .write_json(
                &format!("{}-response.json", self.base),
                &serde_json::to_value(results.payloads())?,
            )
            .await?;

        info!("{}: {} pages", self.base, document.pages().len());

        for (i, page) in document.pages().iter().enumerate() {
            let p = i + 1;
            self.emitter
                .write_json(
                    &self.page_name(p, "response.json"),
                    &serde_json::to_value(page.blocks())?,
                )
                .await?;
            self.write_words(page, p).await?;
            self.emitter
                .write_text(&self.page_name(p, "text.txt"), page.text())
                .await?;
            if self.features.forms {
                self.write_forms(page, p).await?;
            }
            if self.features.tables {
                self.write_tables(page, p).await?;
            }
        }

        Ok(())
    }

    async fn write_words(&self, page: &Page, p: usize) -> Result<(), OutputError> {
        let rows: Vec<Vec<String>> = page
            .words()
            .map(|w| vec![w.id.clone(), w.text.clone()])
            .collect();
        self.emitter
            .write_table(&self.page_name(p, "words.csv"), &["Word-Id", "Word-Text"], &rows)
            .await
    }

    async fn write_forms(&self, page: &Page, p: usize) -> Result<(), OutputError> {
        let rows: Vec<Vec<String>> = page
            .form()
            .fields
            .iter()
            .map(|f| {
                vec![
                    f.key_text().to_string(),
                    confidence(f.key.as_ref().and_then(|k| k.confidence)),
                    f.value_text().to_string(),
                    confidence(f.value.as_ref().and_then(|v| v.confidence)),
                ]
            })
            .collect();
        self.emitter
            .write_table(
                &self.page_name(p, "forms.csv"),
                &["Key", "KeyConfidence", "Value", "ValueConfidence"],
                &rows,
            )
            .await
    }

    async fn write_tables(&self, page: &Page, p: usize) -> Result<(), OutputError> {
        let mut rows: Vec<Vec<String>> = Vec::new();
        for table in page.tables() {
            rows.push(vec!["Table".to_string()]);
            for row in &table.rows {
                rows.push(row.cells.iter().map(|c| c.text.clone()).collect());
            }
            rows.push(Vec::new());
            rows.push(Vec::new());
        }
        self.emitter
            .write_table(&self.page_name(p, "tables.csv"), &[], &rows)
            .await
    }

    /// Write the insight artifacts of one page for the requested categories.
    /// Categories that failed on the page are skipped.
    pub async fn write_insights(
        &self,
        report: &PageInsightReport,
        requested: &[InsightCategory],
    ) -> Result<(), OutputError> {
        let p = report.page_number;

        for &category in requested {
            if report.failed(category) {
                warn!(
                    "{} page {}: skipping {} output after failure",
                    self.base, p, category
                );
                continue;
            }

            match category {
                InsightCategory::Sentiment => {
                    let rows: Vec<Vec<String>> = report
                        .sentiment
                        .iter()
                        .map(|s| vec![s.sentiment.as_str().to_string()])
                        .collect();
                    self.emitter
                        .write_table(
                            &self.page_name(p, "insights-sentiment.csv"),
                            &["Sentiment"],
                            &rows,
                        )
                        .await?;
                }
                InsightCategory::Entities => {
                    let rows: Vec<Vec<String>> = report
                        .entities
                        .iter()
                        .map(|e| {
                            vec![
                                e.entity_type.clone(),
                                e.text.clone(),
                                e.score.to_string(),
                                e.begin_offset.to_string(),
                                e.end_offset.to_string(),
                            ]
                        })
                        .collect();
                    self.emitter
                        .write_table(
                            &self.page_name(p, "insights-entities.csv"),
                            &["Type", "Text", "Score", "BeginOffset", "EndOffset"],
                            &rows,
                        )
                        .await?;
                }
                InsightCategory::Syntax => {
                    let rows: Vec<Vec<String>> = report
                        .syntax
                        .iter()
                        .map(|t| {
                            vec![
                                t.tag.clone(),
                                t.score.to_string(),
                                t.text.clone(),
                                t.begin_offset.to_string(),
                                t.end_offset.to_string(),
                            ]
                        })
                        .collect();
                    self.emitter
                        .write_table(
                            &self.page_name(p, "insights-syntax.csv"),
                            &[
                                "PartOfSpeech-Tag",
                                "PartOfSpeech-Score",
                                "Text",
                                "BeginOffset",
                                "EndOffset",
                            ],
                            &rows,
                        )
                        .await?;
                }
                InsightCategory::KeyPhrases => {
                    let rows: Vec<Vec<String>> = report
                        .key_phrases
                        .iter()
                        .map(|k| {
                            vec![
                                k.text.clone(),
                                k.score.to_string(),
                                k.begin_offset.to_string(),
                                k.end_offset.to_string(),
                            ]
                        })
                        .collect();
                    self.emitter
                        .write_table(
                            &self.page_name(p, "insights-keyPhrases.csv"),
                            &["Text", "Score", "BeginOffset", "EndOffset"],
                            &rows,
                        )
                        .await?;
                }
                InsightCategory::MedicalEntities => {
                    let rows: Vec<Vec<String>> = report
                        .medical_entities
                        .iter()
                        .map(|e| {
                            vec![
                                e.text.clone(),
                                e.entity_type.clone(),
                                e.category.clone(),
                                e.score.to_string(),
                                e.begin_offset.to_string(),
                                e.end_offset.to_string(),
                            ]
                        })
                        .collect();
                    self.emitter
                        .write_table(
                            &self.page_name(p, "medical-insights-entities.csv"),
                            &["Text", "Type", "Category", "Score", "BeginOffset", "EndOffset"],
                            &rows,
                        )
                        .await?;
                }
                InsightCategory::Phi => {
                    self.emitter
                        .write_json(
                            &self.page_name(p, "medical-insights-phi.json"),
                            &serde_json::to_value(&report.phi)?,
                        )
                        .await?;
                }
                InsightCategory::Translation => {
                    self.emitter
                        .write_text(
                            &self.page_name(p, "text-translation.txt"),
                            report.translation.as_deref().unwrap_or(""),
                        )
                        .await?;
                }
            }
        }

        Ok(())
    }
}
