//! Block-based document model.
//!
//! Turns the flat, id-linked block lists of a [`ResultSet`] into pages with
//! lines, words, form fields and tables. Blocks of all result pages are
//! indexed together, so a relationship may point at a block that arrived in
//! a later result page.

mod page;

use std::collections::HashMap;

use crate::models::{AnalysisPayload, Block, BlockType, ResultSet};

pub use page::{Cell, Field, FieldText, Form, Line, Page, Row, Table, Word};

/// An analyzed document split into pages.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pages: Vec<Page>,
}

impl Document {
    pub fn from_result_set(results: &ResultSet) -> Self {
        Self::from_blocks(results.blocks().cloned().collect())
    }

    pub fn from_payloads<'a>(payloads: impl IntoIterator<Item = &'a AnalysisPayload>) -> Self {
        Self::from_blocks(
            payloads
                .into_iter()
                .flat_map(|p| p.blocks.iter().cloned())
                .collect(),
        )
    }

    fn from_blocks(blocks: Vec<Block>) -> Self {
        let index: HashMap<String, Block> = blocks
            .iter()
            .map(|b| (b.id.clone(), b.clone()))
            .collect();

        // A new page starts at every PAGE block; anything before the first
        // one belongs to the first page.
        let mut grouped: Vec<Vec<Block>> = Vec::new();
        for block in blocks {
            if block.block_type == BlockType::Page || grouped.is_empty() {
                grouped.push(Vec::new());
            }
            if let Some(current) = grouped.last_mut() {
                current.push(block);
            }
        }

        Self {
            pages: grouped
                .into_iter()
                .map(|blocks| Page::build(blocks, &index))
                .collect(),
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> AnalysisPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_lines_words_and_text() {
        let results = ResultSet::single(payload(
            r#"{"Blocks": [
                {"Id": "p1", "BlockType": "PAGE"},
                {"Id": "l1", "BlockType": "LINE", "Text": "Patient Name", "Relationships": [{"Type": "CHILD", "Ids": ["w1", "w2"]}]},
                {"Id": "w1", "BlockType": "WORD", "Text": "Patient", "Confidence": 99.0},
                {"Id": "w2", "BlockType": "WORD", "Text": "Name", "Confidence": 98.5},
                {"Id": "l2", "BlockType": "LINE", "Text": "Jane Doe", "Relationships": [{"Type": "CHILD", "Ids": ["w3", "w4"]}]},
                {"Id": "w3", "BlockType": "WORD", "Text": "Jane"},
                {"Id": "w4", "BlockType": "WORD", "Text": "Doe"},
                {"Id": "p2", "BlockType": "PAGE"},
                {"Id": "l3", "BlockType": "LINE", "Text": "Page two"}
            ]}"#,
        ));

        let doc = Document::from_result_set(&results);

        assert_eq!(doc.pages().len(), 2);
        let first = &doc.pages()[0];
        assert_eq!(first.text(), "Patient Name\nJane Doe\n");
        let words: Vec<&str> = first.words().map(|w| w.text.as_str()).collect();
        assert_eq!(words, vec!["Patient", "Name", "Jane", "Doe"]);
        assert_eq!(doc.pages()[1].text(), "Page two\n");
        assert_eq!(doc.pages()[1].blocks().len(), 2);
    }

    #[test]
    fn test_form_value_in_later_result_page() {
        let mut results = ResultSet::new();
        results.push(payload(
            r#"{"NextToken": "t1", "Blocks": [
                {"Id": "p1", "BlockType": "PAGE"},
                {"Id": "k1", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["KEY"], "Confidence": 91.0,
                 "Relationships": [{"Type": "CHILD", "Ids": ["w1", "w2"]}, {"Type": "VALUE", "Ids": ["v1"]}]},
                {"Id": "w1", "BlockType": "WORD", "Text": "Phone"},
                {"Id": "w2", "BlockType": "WORD", "Text": "Number:"}
            ]}"#,
        ));
        results.push(payload(
            r#"{"Blocks": [
                {"Id": "v1", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["VALUE"], "Confidence": 88.0,
                 "Relationships": [{"Type": "CHILD", "Ids": ["w3"]}]},
                {"Id": "w3", "BlockType": "WORD", "Text": "555-0100"}
            ]}"#,
        ));

        let doc = Document::from_result_set(&results);

        assert_eq!(doc.pages().len(), 1);
        let form = doc.pages()[0].form();
        let field = form.field_by_key("Phone Number:").unwrap();
        assert_eq!(field.value_text(), "555-0100");
        assert_eq!(field.value.as_ref().unwrap().confidence, Some(88.0));
        assert_eq!(form.search_fields_by_key("phone").len(), 1);
        assert!(form.search_fields_by_key("address").is_empty());
    }

    #[test]
    fn test_table_rows_sorted_by_column() {
        let results = ResultSet::single(payload(
            r#"{"Blocks": [
                {"Id": "p1", "BlockType": "PAGE"},
                {"Id": "t1", "BlockType": "TABLE", "Relationships": [{"Type": "CHILD", "Ids": ["c4", "c3", "c2", "c1"]}]},
                {"Id": "c1", "BlockType": "CELL", "RowIndex": 1, "ColumnIndex": 1, "Relationships": [{"Type": "CHILD", "Ids": ["w1"]}]},
                {"Id": "c2", "BlockType": "CELL", "RowIndex": 1, "ColumnIndex": 2, "Relationships": [{"Type": "CHILD", "Ids": ["s1"]}]},
                {"Id": "c3", "BlockType": "CELL", "RowIndex": 2, "ColumnIndex": 1},
                {"Id": "c4", "BlockType": "CELL", "RowIndex": 2, "ColumnIndex": 2, "Relationships": [{"Type": "CHILD", "Ids": ["w2"]}]},
                {"Id": "w1", "BlockType": "WORD", "Text": "Allergy"},
                {"Id": "s1", "BlockType": "SELECTION_ELEMENT", "SelectionStatus": "SELECTED"},
                {"Id": "w2", "BlockType": "WORD", "Text": "None"}
            ]}"#,
        ));

        let doc = Document::from_result_set(&results);
        let tables = doc.pages()[0].tables();

        assert_eq!(tables.len(), 1);
        let rows: Vec<Vec<&str>> = tables[0]
            .rows
            .iter()
            .map(|r| r.cells.iter().map(|c| c.text.as_str()).collect())
            .collect();
        assert_eq!(rows, vec![vec!["Allergy", "[X]"], vec!["", "None"]]);
    }

    #[test]
    fn test_empty_result_set_has_no_pages() {
        let doc = Document::from_result_set(&ResultSet::new());
        assert!(doc.is_empty());
    }
}
