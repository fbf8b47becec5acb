//! Splits page text into bounded, contiguous segments.

use super::InsightError;
use crate::models::TextSegment;

/// Default maximum segment length, in characters.
pub const DEFAULT_SEGMENT_LENGTH: usize = 2000;

#[derive(Debug, Clone, Copy)]
pub struct InsightChunker {
    max_len: usize,
}

impl Default for InsightChunker {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_SEGMENT_LENGTH,
        }
    }
}

impl InsightChunker {
    pub fn new(max_len: usize) -> Result<Self, InsightError> {
        if max_len == 0 {
            return Err(InsightError::InvalidSegmentLength);
        }
        Ok(Self { max_len })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Split `text` into segments of at most `max_len` characters.
    ///
    /// Offsets count characters, so a segment boundary never falls inside a
    /// multi-byte character. Empty text yields no segments.
    pub fn split(&self, page_number: usize, text: &str) -> Vec<TextSegment> {
        let starts: Vec<usize> = text
            .char_indices()
            .step_by(self.max_len)
            .map(|(byte_idx, _)| byte_idx)
            .collect();
        let total = text.chars().count();

        starts
            .iter()
            .enumerate()
            .map(|(index, &start_byte)| {
                let end_byte = starts.get(index + 1).copied().unwrap_or(text.len());
                let start_offset = index * self.max_len;
                TextSegment {
                    page_number,
                    index,
                    start_offset,
                    end_offset: (start_offset + self.max_len).min(total),
                    text: text[start_byte..end_byte].to_string(),
                }
            })
            .collect()
    }
}
