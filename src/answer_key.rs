//! Answer-key resolver
//!
//! Loads the external correction table and cross-references it against the
//! detected questions, independently of any marker embedded in the template.
//!
//! Two table shapes are supported:
//! - Shape A (primary): one row per question, columns "question number" and
//!   "correct answer letter"; used to verify which letter lands in display
//!   position 1 for each learner.
//! - Shape B (degraded fallback): one row per module, columns "module" and
//!   "number of correct answers"; used directly as the pre-computed result,
//!   bypassing per-question verification.
//!
//! Row-level problems never abort the batch: a corrupt key row must not
//! block unrelated questions.

use crate::error::{AppError, AppResult, KeyError, SpreadsheetError};
use crate::spreadsheet::{read_csv_rows, read_xlsx_rows};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Resolved answer key
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerKey {
    /// Shape A: question number -> correct letter
    PerQuestion(HashMap<String, char>),
    /// Shape B: module -> pre-aggregated correct count
    PerModule(HashMap<String, u32>),
}

impl AnswerKey {
    /// Correct letter for a question number (shape A only).
    ///
    /// `None` means the question is excluded from matching: it still counts
    /// in the total but is never scored correct.
    pub fn letter_for(&self, number: &str) -> Option<char> {
        match self {
            AnswerKey::PerQuestion(map) => map.get(number).copied(),
            AnswerKey::PerModule(_) => None,
        }
    }

    /// Pre-aggregated correct count for a module (shape B only)
    pub fn module_count(&self, module: &str) -> Option<u32> {
        match self {
            AnswerKey::PerQuestion(_) => None,
            AnswerKey::PerModule(map) => map.get(module).copied(),
        }
    }

    pub fn is_per_module(&self) -> bool {
        matches!(self, AnswerKey::PerModule(_))
    }

    pub fn len(&self) -> usize {
        match self {
            AnswerKey::PerQuestion(map) => map.len(),
            AnswerKey::PerModule(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What the loader kept and what it dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyLoadReport {
    pub entries: usize,
    pub dropped_rows: usize,
}

/// Lowercase, trim, fold the accents the French headers carry
fn fold_header(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' => 'a',
            'î' | 'ï' => 'i',
            'ô' => 'o',
            'û' | 'ù' => 'u',
            'ç' => 'c',
            _ => c,
        })
        .collect()
}

fn is_question_number_header(name: &str) -> bool {
    let folded = fold_header(name);
    folded == "numero de la question"
        || folded == "question number"
        || folded == "numero question"
        || folded == "question"
}

fn is_letter_header(name: &str) -> bool {
    let folded = fold_header(name);
    folded == "reponse correcte" || folded == "correct answer" || folded == "lettre"
}

fn is_module_header(name: &str) -> bool {
    fold_header(name) == "module"
}

fn is_count_header(name: &str) -> bool {
    let folded = fold_header(name);
    folded == "nombre de bonnes reponses"
        || folded == "bonnes reponses"
        || folded == "correct count"
        || folded == "number of correct answers"
}

/// Parse a correct-answer letter: trimmed, uppercased, must be exactly one
/// of A-D. Anything else invalidates the row.
fn parse_letter(raw: &str) -> Option<char> {
    let cleaned = raw.trim().to_uppercase();
    let mut chars = cleaned.chars();
    match (chars.next(), chars.next()) {
        (Some(c @ 'A'..='D'), None) => Some(c),
        _ => None,
    }
}

/// Build an answer key from a header row plus data rows.
///
/// Shape is decided from the header; rows with missing or unparseable
/// values are dropped with a warning and counted in the report.
pub fn parse_key_rows(
    headers: &[String],
    rows: &[Vec<String>],
) -> AppResult<(AnswerKey, KeyLoadReport)> {
    let find = |pred: fn(&str) -> bool| headers.iter().position(|h| pred(h));

    let mut report = KeyLoadReport::default();

    if let (Some(number_col), Some(letter_col)) =
        (find(is_question_number_header), find(is_letter_header))
    {
        let mut map = HashMap::new();
        for (row_idx, row) in rows.iter().enumerate() {
            let number = row.get(number_col).map(|s| s.trim()).unwrap_or("");
            let raw_letter = row.get(letter_col).map(|s| s.trim()).unwrap_or("");
            if number.is_empty() || raw_letter.is_empty() {
                report.dropped_rows += 1;
                continue;
            }
            match parse_letter(raw_letter) {
                Some(letter) => {
                    map.insert(number.to_string(), letter);
                }
                None => {
                    warn!(
                        "⚠️ Key row {} dropped: letter '{}' is not one of A-D",
                        row_idx + 2,
                        raw_letter
                    );
                    report.dropped_rows += 1;
                }
            }
        }
        report.entries = map.len();
        return Ok((AnswerKey::PerQuestion(map), report));
    }

    if let (Some(module_col), Some(count_col)) = (find(is_module_header), find(is_count_header)) {
        let mut map = HashMap::new();
        for (row_idx, row) in rows.iter().enumerate() {
            let module = row.get(module_col).map(|s| s.trim()).unwrap_or("");
            let raw_count = row.get(count_col).map(|s| s.trim()).unwrap_or("");
            if module.is_empty() || raw_count.is_empty() {
                report.dropped_rows += 1;
                continue;
            }
            match raw_count.parse::<u32>() {
                Ok(count) => {
                    map.insert(module.to_string(), count);
                }
                Err(_) => {
                    warn!(
                        "⚠️ Key row {} dropped: count '{}' is not a number",
                        row_idx + 2,
                        raw_count
                    );
                    report.dropped_rows += 1;
                }
            }
        }
        report.entries = map.len();
        return Ok((AnswerKey::PerModule(map), report));
    }

    Err(AppError::Key(KeyError::UnrecognizedShape {
        headers: headers.to_vec(),
    }))
}

/// Load the key from a tabular file, dispatching on the extension
pub fn load_answer_key(path: &str) -> AppResult<(AnswerKey, KeyLoadReport)> {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let (headers, rows) = match extension.as_str() {
        "xlsx" | "xls" => read_xlsx_rows(path)?,
        "csv" => read_csv_rows(path)?,
        _ => {
            return Err(AppError::Spreadsheet(SpreadsheetError::UnsupportedFormat {
                extension,
            }))
        }
    };

    parse_key_rows(&headers, &rows)
}
