//! Chunked insight extraction.
//!
//! Page text is split into bounded segments, every requested category is
//! extracted per segment, and segment-local offsets are shifted to page
//! offsets before the rows are aggregated into a [`PageInsightReport`].
//!
//! [`PageInsightReport`]: crate::models::PageInsightReport

mod aggregator;
mod chunker;
mod error;
mod extractor;

pub use aggregator::InsightAggregator;
pub use chunker::{InsightChunker, DEFAULT_SEGMENT_LENGTH};
pub use error::InsightError;
pub use extractor::{Extraction, Extractor, InsightOptions, InsightServices};
