//! Text segments, insight annotations and per-page insight reports.
//!
//! All offsets are counted in characters (Unicode scalar values) of the page
//! text. Annotations returned by a collaborator start out relative to the
//! segment they were extracted from and are shifted to page-global offsets
//! with [`Anchored::shift`] before they reach a report.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A bounded, contiguous slice of a page's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub page_number: usize,
    /// Position of this segment within its page.
    pub index: usize,
    /// Global start offset, inclusive.
    pub start_offset: usize,
    /// Global end offset, exclusive.
    pub end_offset: usize,
    pub text: String,
}

impl TextSegment {
    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    pub fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }
}

/// An annotation carrying a `[begin, end)` character span.
pub trait Anchored {
    fn span(&self) -> (usize, usize);

    /// Move the span by `by` characters (segment-local to page-global).
    fn shift(&mut self, by: usize);
}

/// Overall sentiment label of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "POSITIVE",
            Sentiment::Negative => "NEGATIVE",
            Sentiment::Neutral => "NEUTRAL",
            Sentiment::Mixed => "MIXED",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sentiment of one segment. Has no offsets and is never remapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub sentiment: Sentiment,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub mixed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxToken {
    /// Part-of-speech tag.
    pub tag: String,
    pub score: f64,
    pub text: String,
    pub begin_offset: usize,
    pub end_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub entity_type: String,
    pub text: String,
    pub score: f64,
    pub begin_offset: usize,
    pub end_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPhrase {
    pub text: String,
    pub score: f64,
    pub begin_offset: usize,
    pub end_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalEntity {
    pub text: String,
    pub entity_type: String,
    pub category: String,
    pub score: f64,
    pub begin_offset: usize,
    pub end_offset: usize,
}

/// A protected-health-information span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PhiSpan {
    pub text: String,
    #[serde(rename = "Type")]
    pub entity_type: String,
    pub category: String,
    pub score: f64,
    pub begin_offset: usize,
    pub end_offset: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<String>,
}

impl Anchored for SyntaxToken {
    fn span(&self) -> (usize, usize) {
        (self.begin_offset, self.end_offset)
    }

    fn shift(&mut self, by: usize) {
        self.begin_offset += by;
        self.end_offset += by;
    }
}

impl Anchored for NamedEntity {
    fn span(&self) -> (usize, usize) {
        (self.begin_offset, self.end_offset)
    }

    fn shift(&mut self, by: usize) {
        self.begin_offset += by;
        self.end_offset += by;
    }
}

impl Anchored for KeyPhrase {
    fn span(&self) -> (usize, usize) {
        (self.begin_offset, self.end_offset)
    }

    fn shift(&mut self, by: usize) {
        self.begin_offset += by;
        self.end_offset += by;
    }
}

impl Anchored for MedicalEntity {
    fn span(&self) -> (usize, usize) {
        (self.begin_offset, self.end_offset)
    }

    fn shift(&mut self, by: usize) {
        self.begin_offset += by;
        self.end_offset += by;
    }
}

impl Anchored for PhiSpan {
    fn span(&self) -> (usize, usize) {
        (self.begin_offset, self.end_offset)
    }

    fn shift(&mut self, by: usize) {
        self.begin_offset += by;
        self.end_offset += by;
    }
}

/// Insight categories that can be requested and fail independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InsightCategory {
    Sentiment,
    Syntax,
    Entities,
    KeyPhrases,
    MedicalEntities,
    Phi,
    Translation,
}

impl InsightCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightCategory::Sentiment => "sentiment",
            InsightCategory::Syntax => "syntax",
            InsightCategory::Entities => "entities",
            InsightCategory::KeyPhrases => "key_phrases",
            InsightCategory::MedicalEntities => "medical_entities",
            InsightCategory::Phi => "phi",
            InsightCategory::Translation => "translation",
        }
    }
}

impl fmt::Display for InsightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A category that stopped producing output for a page.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryFailure {
    pub category: InsightCategory,
    /// Index of the segment whose call failed.
    pub segment_index: usize,
    pub message: String,
}

/// Aggregated insights for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageInsightReport {
    pub page_number: usize,
    pub sentiment: Vec<SentimentScore>,
    pub syntax: Vec<SyntaxToken>,
    pub entities: Vec<NamedEntity>,
    pub key_phrases: Vec<KeyPhrase>,
    pub medical_entities: Vec<MedicalEntity>,
    pub phi: Vec<PhiSpan>,
    /// `None` unless translation was requested.
    pub translation: Option<String>,
    pub failures: Vec<CategoryFailure>,
}

impl PageInsightReport {
    pub fn new(page_number: usize) -> Self {
        Self {
            page_number,
            ..Default::default()
        }
    }

    pub fn failed(&self, category: InsightCategory) -> bool {
        self.failures.iter().any(|f| f.category == category)
    }

    /// Drop everything accumulated for a category.
    pub fn clear(&mut self, category: InsightCategory) {
        match category {
            InsightCategory::Sentiment => self.sentiment.clear(),
            InsightCategory::Syntax => self.syntax.clear(),
            InsightCategory::Entities => self.entities.clear(),
            InsightCategory::KeyPhrases => self.key_phrases.clear(),
            InsightCategory::MedicalEntities => self.medical_entities.clear(),
            InsightCategory::Phi => self.phi.clear(),
            InsightCategory::Translation => self.translation = None,
        }
    }

    /// True when no category produced any output.
    pub fn is_empty(&self) -> bool {
        self.sentiment.is_empty()
            && self.syntax.is_empty()
            && self.entities.is_empty()
            && self.key_phrases.is_empty()
            && self.medical_entities.is_empty()
            && self.phi.is_empty()
            && self.translation.as_deref().map_or(true, str::is_empty)
    }
}
