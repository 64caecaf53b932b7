//! Tabular input/output
//!
//! The thin boundary to the spreadsheet collaborator: reads learner records
//! (and raw rows for the answer key) from .xlsx or .csv, validates the
//! required columns, and writes the batch summary.
//!
//! Column matching tolerates surrounding whitespace, case differences and
//! missing accents, because the operator-supplied files are inconsistent.

use crate::error::{AppError, AppResult, SpreadsheetError};
use crate::models::LearnerRecord;
use crate::scoring::LearnerResult;
use calamine::{open_workbook, Data, Reader, Xlsx};
use serde::Serialize;
use std::path::Path;
use tracing::warn;

// ========== Generic row access ==========

/// Helper to extract a string from an Excel cell
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
        Data::Empty => String::new(),
    }
}

/// Read header + data rows from the first sheet of an .xlsx file
pub(crate) fn read_xlsx_rows(path: &str) -> AppResult<(Vec<String>, Vec<Vec<String>>)> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e| AppError::spreadsheet_open_failed(path, e))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .ok_or_else(|| {
            AppError::Spreadsheet(SpreadsheetError::EmptySheet {
                path: path.to_string(),
            })
        })?
        .clone();

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| AppError::spreadsheet_open_failed(path, e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| {
            AppError::Spreadsheet(SpreadsheetError::EmptySheet {
                path: path.to_string(),
            })
        })?
        .iter()
        .map(cell_to_string)
        .collect();

    let data = rows
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    Ok((headers, data))
}

/// Read header + data rows from a .csv file
pub(crate) fn read_csv_rows(path: &str) -> AppResult<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| AppError::spreadsheet_open_failed(path, e))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::spreadsheet_open_failed(path, e))?
        .iter()
        .map(|s| s.trim().to_string())
        .collect();

    let mut data = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            AppError::Spreadsheet(SpreadsheetError::RowReadFailed {
                row: row_idx + 2,
                source: Box::new(e),
            })
        })?;
        data.push(record.iter().map(|s| s.trim().to_string()).collect());
    }
    Ok((headers, data))
}

/// Dispatch on the file extension
pub(crate) fn read_rows(path: &str) -> AppResult<(Vec<String>, Vec<Vec<String>>)> {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "xlsx" | "xls" => read_xlsx_rows(path),
        "csv" => read_csv_rows(path),
        _ => Err(AppError::Spreadsheet(SpreadsheetError::UnsupportedFormat {
            extension,
        })),
    }
}

// ========== Learner records ==========

/// Column indices for the required learner fields
#[derive(Debug, Default, Clone)]
struct ColumnMapping {
    first_name: Option<usize>,
    last_name: Option<usize>,
    email: Option<usize>,
    session_ref: Option<usize>,
    evaluation_date: Option<usize>,
}

/// Lowercase, trim, fold accents
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

/// Detect column indices from header names.
///
/// A batch-level fatal error listing every missing semantic column when the
/// header does not carry all five required fields.
fn detect_columns(headers: &[String]) -> AppResult<ColumnMapping> {
    let mut mapping = ColumnMapping::default();

    for (i, header) in headers.iter().enumerate() {
        match fold_header(header).as_str() {
            "prenom" | "first name" => mapping.first_name = Some(i),
            "nom" | "last name" => mapping.last_name = Some(i),
            "email" | "e-mail" | "courriel" => mapping.email = Some(i),
            "reference session" | "ref session" | "session" => mapping.session_ref = Some(i),
            "date evaluation" | "date d'evaluation" | "date" => {
                mapping.evaluation_date = Some(i)
            }
            _ => {} // unknown columns ignored
        }
    }

    let mut missing = Vec::new();
    if mapping.first_name.is_none() {
        missing.push("Prénom".to_string());
    }
    if mapping.last_name.is_none() {
        missing.push("Nom".to_string());
    }
    if mapping.email.is_none() {
        missing.push("Email".to_string());
    }
    if mapping.session_ref.is_none() {
        missing.push("Référence Session".to_string());
    }
    if mapping.evaluation_date.is_none() {
        missing.push("Date Évaluation".to_string());
    }

    if missing.is_empty() {
        Ok(mapping)
    } else {
        Err(AppError::Spreadsheet(SpreadsheetError::MissingColumns {
            columns: missing,
        }))
    }
}

fn field(row: &[String], col: Option<usize>) -> String {
    col.and_then(|i| row.get(i)).cloned().unwrap_or_default()
}

/// Build learner records from headers + rows (shared by file loaders and
/// tests)
pub fn parse_learner_rows(
    headers: &[String],
    rows: &[Vec<String>],
) -> AppResult<Vec<LearnerRecord>> {
    let mapping = detect_columns(headers)?;

    let mut learners = Vec::new();
    for (row_idx, row) in rows.iter().enumerate() {
        let learner = LearnerRecord {
            first_name: field(row, mapping.first_name),
            last_name: field(row, mapping.last_name),
            email: field(row, mapping.email),
            session_ref: field(row, mapping.session_ref),
            evaluation_date: field(row, mapping.evaluation_date),
        };
        if learner.first_name.is_empty() && learner.last_name.is_empty() {
            warn!("⚠️ Learner row {} skipped: no identity fields", row_idx + 2);
            continue;
        }
        learners.push(learner);
    }
    Ok(learners)
}

/// Load the learner batch from a spreadsheet file
pub fn load_learners(path: &str) -> AppResult<Vec<LearnerRecord>> {
    let (headers, rows) = read_rows(path)?;
    parse_learner_rows(&headers, &rows)
}

// ========== Batch summary ==========

/// One summary row per successfully rendered learner
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "Prénom")]
    pub first_name: String,
    #[serde(rename = "Nom")]
    pub last_name: String,
    #[serde(rename = "Réf Session")]
    pub session_ref: String,
    #[serde(rename = "Score")]
    pub score: u32,
    #[serde(rename = "Total")]
    pub total: u32,
    #[serde(rename = "Pourcentage")]
    pub percentage: f64,
    #[serde(rename = "Résultat")]
    pub outcome: String,
}

impl SummaryRow {
    pub fn new(learner: &LearnerRecord, result: &LearnerResult) -> Self {
        Self {
            first_name: learner.first_name.clone(),
            last_name: learner.last_name.clone(),
            session_ref: learner.session_ref.clone(),
            score: result.score,
            total: result.total,
            percentage: result.percentage,
            outcome: result.outcome.to_string(),
        }
    }
}

/// Write the batch summary as CSV
pub fn write_summary(path: &str, rows: &[SummaryRow]) -> AppResult<()> {
    let mut writer =
        csv::Writer::from_path(path).map_err(|e| AppError::spreadsheet_open_failed(path, e))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::spreadsheet_open_failed(path, e))?;
    Ok(())
}
