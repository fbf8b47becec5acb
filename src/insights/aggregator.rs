//! Per-page insight aggregation with offset remapping and failure isolation.

use std::collections::HashSet;

use futures::future::join_all;
use tracing::{debug, warn};

use super::{Extraction, Extractor, InsightChunker, InsightError};
use crate::analysis::RetryPolicy;
use crate::document::Document;
use crate::models::{Anchored, CategoryFailure, InsightCategory, PageInsightReport, TextSegment};

/// Runs the resolved extractors over every segment of a page.
#[derive(Debug, Clone)]
pub struct InsightAggregator {
    chunker: InsightChunker,
    extractors: Vec<Extractor>,
    retry: RetryPolicy,
}

impl InsightAggregator {
    pub fn new(chunker: InsightChunker, extractors: Vec<Extractor>) -> Self {
        Self {
            chunker,
            extractors,
            retry: RetryPolicy::default(),
        }
    }

    /// Retry policy applied to each extractor call.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// True when no category was requested.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    pub fn categories(&self) -> Vec<InsightCategory> {
        self.extractors.iter().map(Extractor::category).collect()
    }

    /// Analyze every page of a document; page numbers are 1-based.
    pub async fn analyze_document(&self, document: &Document) -> Vec<PageInsightReport> {
        let mut reports = Vec::with_capacity(document.pages().len());
        for (i, page) in document.pages().iter().enumerate() {
            reports.push(self.analyze_page(i + 1, page.text()).await);
        }
        reports
    }

    /// Extract insights from one page of text.
    ///
    /// Extractors of one segment run concurrently; their results are applied
    /// in extractor order. Throttled and transient failures are retried; a
    /// category that still fails is cleared for the page and skipped for the
    /// remaining segments.
    pub async fn analyze_page(&self, page_number: usize, text: &str) -> PageInsightReport {
        let mut report = PageInsightReport::new(page_number);
        let segments = self.chunker.split(page_number, text);
        if segments.is_empty() || self.extractors.is_empty() {
            return report;
        }

        let mut disabled: HashSet<InsightCategory> = HashSet::new();

        for segment in &segments {
            let active: Vec<&Extractor> = self
                .extractors
                .iter()
                .filter(|e| !disabled.contains(&e.category()))
                .collect();
            if active.is_empty() {
                break;
            }

            debug!(
                "Page {} segment {} [{}, {}): {} extractors",
                page_number,
                segment.index,
                segment.start_offset,
                segment.end_offset,
                active.len()
            );

            let results = join_all(active.iter().map(|e| {
                self.retry
                    .run(e.category().as_str(), || e.extract(&segment.text))
            }))
            .await;

            for (extractor, result) in active.iter().zip(results) {
                let category = extractor.category();
                match result {
                    Ok(extraction) => apply(&mut report, segment, extraction),
                    Err(source) => {
                        let err = InsightError::Extraction { category, source };
                        warn!("Page {} segment {}: {}", page_number, segment.index, err);
                        report.clear(category);
                        report.failures.push(CategoryFailure {
                            category,
                            segment_index: segment.index,
                            message: err.to_string(),
                        });
                        disabled.insert(category);
                    }
                }
            }
        }

        report
    }
}

fn remapped<T: Anchored>(mut items: Vec<T>, by: usize) -> Vec<T> {
    for item in &mut items {
        item.shift(by);
    }
    items
}

fn apply(report: &mut PageInsightReport, segment: &TextSegment, extraction: Extraction) {
    let start = segment.start_offset;
    match extraction {
        Extraction::Sentiment(score) => report.sentiment.push(score),
        Extraction::Syntax(tokens) => report.syntax.extend(remapped(tokens, start)),
        Extraction::Entities(entities) => report.entities.extend(remapped(entities, start)),
        Extraction::KeyPhrases(phrases) => report.key_phrases.extend(remapped(phrases, start)),
        Extraction::MedicalEntities(entities) => {
            report.medical_entities.extend(remapped(entities, start))
        }
        Extraction::Phi(spans) => report.phi.extend(remapped(spans, start)),
        Extraction::Translation(text) => {
            let translation = report.translation.get_or_insert_with(String::new);
            if segment.index > 0 {
                translation.push('\n');
            }
            translation.push_str(&text);
        }
    }
}
