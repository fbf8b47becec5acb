//! Ordered collection of result pages for one document.

use serde::Serialize;

use super::{AnalysisPayload, Block};

/// One raw response page, tagged with its arrival position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultPage {
    pub ordinal: usize,
    pub payload: AnalysisPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

/// Append-only, arrival-ordered list of result pages.
///
/// Order matters: blocks in later pages may reference blocks from earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pages: Vec<ResultPage>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a one-page result set from a synchronous response.
    pub fn single(payload: AnalysisPayload) -> Self {
        let mut set = Self::new();
        set.push(payload);
        set
    }

    /// Append the next page. Its ordinal is its position in arrival order.
    pub fn push(&mut self, payload: AnalysisPayload) -> &ResultPage {
        let continuation_token = payload.next_token.clone();
        let ordinal = self.pages.len();
        self.pages.push(ResultPage {
            ordinal,
            payload,
            continuation_token,
        });
        &self.pages[ordinal]
    }

    pub fn pages(&self) -> &[ResultPage] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// True once the last page carries no continuation token.
    pub fn is_complete(&self) -> bool {
        self.pages
            .last()
            .is_some_and(|p| p.continuation_token.is_none())
    }

    /// All blocks of all pages, in arrival order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.pages.iter().flat_map(|p| p.payload.blocks.iter())
    }

    /// The raw payloads, in arrival order.
    pub fn payloads(&self) -> Vec<&AnalysisPayload> {
        self.pages.iter().map(|p| &p.payload).collect()
    }

    pub fn into_payloads(self) -> Vec<AnalysisPayload> {
        self.pages.into_iter().map(|p| p.payload).collect()
    }
}

impl FromIterator<AnalysisPayload> for ResultSet {
    fn from_iter<I: IntoIterator<Item = AnalysisPayload>>(iter: I) -> Self {
        let mut set = ResultSet::new();
        for payload in iter {
            set.push(payload);
        }
        set
    }
}
