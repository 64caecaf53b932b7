//! Text-block document model
//!
//! The rich-document reader/writer is an external collaborator: an upstream
//! converter turns a .docx into an ordered block dump (JSON) and turns the
//! rendered dump back into a .docx. This module is the in-process model of
//! that dump.
//!
//! A block's visible text may be fragmented into several runs by the
//! producing tool. `text()` exposes the concatenated text; `set_text()`
//! collapses the block back into a single run, which is the accepted
//! formatting trade-off for substituted blocks.

use crate::error::{AppError, AppResult, TemplateError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One paragraph-level block, possibly fragmented into runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    runs: Vec<String>,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            runs: vec![text.into()],
        }
    }

    /// Build a block from pre-fragmented runs
    pub fn from_runs(runs: Vec<String>) -> Self {
        Self { runs }
    }

    /// Full visible text of the block (all runs concatenated)
    pub fn text(&self) -> String {
        self.runs.concat()
    }

    /// Replace the block's content with a single run
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.runs = vec![text.into()];
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.is_empty())
    }

    pub fn runs(&self) -> &[String] {
        &self.runs
    }
}

/// One cell of a tabular region; cells contain nested blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub blocks: Vec<TextBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

/// The whole document: body blocks, tables, optional headers/footers.
///
/// Question detection only walks `blocks`; placeholder substitution reaches
/// every block collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentModel {
    #[serde(default)]
    pub blocks: Vec<TextBlock>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub headers: Vec<TextBlock>,
    #[serde(default)]
    pub footers: Vec<TextBlock>,
}

impl DocumentModel {
    /// Load a block dump from disk
    pub fn load(path: &str) -> AppResult<Self> {
        if !Path::new(path).exists() {
            return Err(AppError::Template(TemplateError::NotFound {
                path: path.to_string(),
            }));
        }
        let data = fs::read(path).map_err(|e| AppError::template_read_failed(path, e))?;
        serde_json::from_slice(&data).map_err(|e| AppError::template_parse_failed(path, e))
    }

    /// Write the document back to disk
    pub fn save(&self, path: &str) -> AppResult<()> {
        let data = serde_json::to_vec_pretty(self)
            .map_err(|e| AppError::document_write_failed(path, e))?;
        fs::write(path, data).map_err(|e| AppError::document_write_failed(path, e))
    }

    /// Visit every block of the document: body, table cells, headers, footers
    pub fn for_each_block(&self, mut f: impl FnMut(&TextBlock)) {
        for block in &self.blocks {
            f(block);
        }
        for table in &self.tables {
            for row in &table.rows {
                for cell in &row.cells {
                    for block in &cell.blocks {
                        f(block);
                    }
                }
            }
        }
        for block in &self.headers {
            f(block);
        }
        for block in &self.footers {
            f(block);
        }
    }

    /// Mutable variant of [`Self::for_each_block`]
    pub fn for_each_block_mut(&mut self, mut f: impl FnMut(&mut TextBlock)) {
        for block in &mut self.blocks {
            f(block);
        }
        for table in &mut self.tables {
            for row in &mut table.rows {
                for cell in &mut row.cells {
                    for block in &mut cell.blocks {
                        f(block);
                    }
                }
            }
        }
        for block in &mut self.headers {
            f(block);
        }
        for block in &mut self.footers {
            f(block);
        }
    }
}
