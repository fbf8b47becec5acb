//! Turns a complete result set into layout and insight artifacts.

use std::sync::Arc;

use tracing::info;

use crate::document::Document;
use crate::insights::InsightAggregator;
use crate::models::{FeatureSet, PageInsightReport, ResultSet};
use crate::output::{OutputError, OutputGenerator, ReportEmitter};

/// What was produced for one document.
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub pages: usize,
    pub insights: Vec<PageInsightReport>,
}

impl DocumentReport {
    /// Number of category failures across all pages.
    pub fn failure_count(&self) -> usize {
        self.insights.iter().map(|r| r.failures.len()).sum()
    }
}

/// Writes layout artifacts and, when categories were requested, insights.
#[derive(Clone)]
pub struct Reporter {
    aggregator: InsightAggregator,
    emitter: Arc<dyn ReportEmitter>,
    features: FeatureSet,
}

impl Reporter {
    pub fn new(
        aggregator: InsightAggregator,
        emitter: Arc<dyn ReportEmitter>,
        features: FeatureSet,
    ) -> Self {
        Self {
            aggregator,
            emitter,
            features,
        }
    }

    pub async fn report(
        &self,
        document_name: &str,
        results: &ResultSet,
    ) -> Result<DocumentReport, OutputError> {
        let document = Document::from_result_set(results);
        let generator = OutputGenerator::new(self.emitter.clone(), document_name, self.features);

        generator.write_layout(results, &document).await?;

        let mut report = DocumentReport {
            pages: document.pages().len(),
            insights: Vec::new(),
        };
        if self.aggregator.is_empty() {
            return Ok(report);
        }

        let categories = self.aggregator.categories();
        report.insights = self.aggregator.analyze_document(&document).await;
        for page in &report.insights {
            generator.write_insights(page, &categories).await?;
        }

        info!(
            "{}: insights for {} pages, {} category failures",
            document_name,
            report.pages,
            report.failure_count()
        );
        Ok(report)
    }
}
