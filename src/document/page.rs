//! Resolved page structures: lines, words, form fields and tables.

use std::collections::{BTreeMap, HashMap};

use crate::models::{Block, BlockType};

/// A recognized word.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub id: String,
    pub text: String,
    pub confidence: Option<f64>,
}

impl Word {
    fn from_block(block: &Block) -> Self {
        Self {
            id: block.id.clone(),
            text: block.text.clone().unwrap_or_default(),
            confidence: block.confidence,
        }
    }
}

/// A line of text and the words it is made of.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub id: String,
    pub text: String,
    pub confidence: Option<f64>,
    pub words: Vec<Word>,
}

/// Text of a form key or value, assembled from its child words.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldText {
    pub id: String,
    pub text: String,
    pub confidence: Option<f64>,
}

/// A key/value pair detected in a form.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: Option<FieldText>,
    pub value: Option<FieldText>,
}

impl Field {
    pub fn key_text(&self) -> &str {
        self.key.as_ref().map(|k| k.text.as_str()).unwrap_or("")
    }

    pub fn value_text(&self) -> &str {
        self.value.as_ref().map(|v| v.text.as_str()).unwrap_or("")
    }
}

/// All form fields of a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form {
    pub fields: Vec<Field>,
}

impl Form {
    /// The first field whose key text equals `key` exactly.
    pub fn field_by_key(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key_text() == key)
    }

    /// Fields whose key contains `needle`, ignoring case.
    pub fn search_fields_by_key(&self, needle: &str) -> Vec<&Field> {
        let needle = needle.to_lowercase();
        self.fields
            .iter()
            .filter(|f| f.key_text().to_lowercase().contains(&needle))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row_index: u32,
    pub column_index: u32,
    pub text: String,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub id: String,
    pub rows: Vec<Row>,
}

/// One page of an analyzed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    blocks: Vec<Block>,
    lines: Vec<Line>,
    form: Form,
    tables: Vec<Table>,
    text: String,
}

impl Page {
    /// Resolve a page from its blocks. `index` holds every block of the
    /// document so relationships may point into other result pages.
    pub(crate) fn build(blocks: Vec<Block>, index: &HashMap<String, Block>) -> Self {
        let mut lines = Vec::new();
        let mut fields = Vec::new();
        let mut tables = Vec::new();
        let mut text = String::new();

        for block in &blocks {
            match block.block_type {
                BlockType::Line => {
                    let line = Line {
                        id: block.id.clone(),
                        text: block.text.clone().unwrap_or_default(),
                        confidence: block.confidence,
                        words: children(block, index)
                            .filter(|c| c.block_type == BlockType::Word)
                            .map(Word::from_block)
                            .collect(),
                    };
                    text.push_str(&line.text);
                    text.push('\n');
                    lines.push(line);
                }
                BlockType::KeyValueSet if block.has_entity_type("KEY") => {
                    let value = block
                        .related_ids("VALUE")
                        .filter_map(|id| index.get(id))
                        .next()
                        .map(|v| field_text(v, index));
                    fields.push(Field {
                        key: Some(field_text(block, index)),
                        value,
                    });
                }
                BlockType::Table => tables.push(build_table(block, index)),
                _ => {}
            }
        }

        Self {
            blocks,
            lines,
            form: Form { fields },
            tables,
            text,
        }
    }

    /// Raw blocks of this page in arrival order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Every word of every line, in line order.
    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.lines.iter().flat_map(|l| l.words.iter())
    }

    /// Line texts in block order, each followed by a newline.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }
}

fn children<'a>(
    block: &'a Block,
    index: &'a HashMap<String, Block>,
) -> impl Iterator<Item = &'a Block> + 'a {
    block.related_ids("CHILD").filter_map(|id| index.get(id))
}

/// Child words joined by spaces; selection marks render as `[X]` / `[ ]`.
fn child_text(block: &Block, index: &HashMap<String, Block>) -> String {
    children(block, index)
        .filter_map(|c| match c.block_type {
            BlockType::Word => c.text.clone(),
            BlockType::SelectionElement => Some(
                if c.selection_status.as_deref() == Some("SELECTED") {
                    "[X]"
                } else {
                    "[ ]"
                }
                .to_string(),
            ),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn field_text(block: &Block, index: &HashMap<String, Block>) -> FieldText {
    FieldText {
        id: block.id.clone(),
        text: child_text(block, index),
        confidence: block.confidence,
    }
}

fn build_table(block: &Block, index: &HashMap<String, Block>) -> Table {
    let mut rows: BTreeMap<u32, Vec<Cell>> = BTreeMap::new();
    for cell in children(block, index).filter(|c| c.block_type == BlockType::Cell) {
        let row_index = cell.row_index.unwrap_or(0);
        rows.entry(row_index).or_default().push(Cell {
            row_index,
            column_index: cell.column_index.unwrap_or(0),
            text: child_text(cell, index),
            confidence: cell.confidence,
        });
    }

    Table {
        id: block.id.clone(),
        rows: rows
            .into_values()
            .map(|mut cells| {
                cells.sort_by_key(|c| c.column_index);
                Row { cells }
            })
            .collect(),
    }
}
