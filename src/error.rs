use std::fmt;

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Template document errors
    Template(TemplateError),
    /// Spreadsheet errors (learner records, summary)
    Spreadsheet(SpreadsheetError),
    /// Answer-key errors
    Key(KeyError),
    /// Per-learner rendering errors
    Render(RenderError),
    /// Configuration errors
    Config(ConfigError),
    /// Other errors (wraps third-party library errors)
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Template(e) => write!(f, "template error: {}", e),
            AppError::Spreadsheet(e) => write!(f, "spreadsheet error: {}", e),
            AppError::Key(e) => write!(f, "answer key error: {}", e),
            AppError::Render(e) => write!(f, "render error: {}", e),
            AppError::Config(e) => write!(f, "config error: {}", e),
            AppError::Other(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Template(e) => Some(e),
            AppError::Spreadsheet(e) => Some(e),
            AppError::Key(e) => Some(e),
            AppError::Render(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// Template document errors
#[derive(Debug)]
pub enum TemplateError {
    /// Template file does not exist
    NotFound {
        path: String,
    },
    /// Reading the template failed
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Parsing the block dump failed
    ParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Writing a rendered document failed
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The template contains no valid question
    NoQuestionsDetected,
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::NotFound { path } => write!(f, "template not found: {}", path),
            TemplateError::ReadFailed { path, source } => {
                write!(f, "failed to read template ({}): {}", path, source)
            }
            TemplateError::ParseFailed { path, source } => {
                write!(f, "failed to parse template ({}): {}", path, source)
            }
            TemplateError::WriteFailed { path, source } => {
                write!(f, "failed to write document ({}): {}", path, source)
            }
            TemplateError::NoQuestionsDetected => {
                write!(f, "no valid question detected in the template")
            }
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TemplateError::ReadFailed { source, .. }
            | TemplateError::ParseFailed { source, .. }
            | TemplateError::WriteFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// Spreadsheet errors (learner records, summary output)
#[derive(Debug)]
pub enum SpreadsheetError {
    /// Opening the file failed
    OpenFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The file has no sheet or no header row
    EmptySheet {
        path: String,
    },
    /// Required columns are missing (batch-level fatal)
    MissingColumns {
        columns: Vec<String>,
    },
    /// Reading a row failed
    RowReadFailed {
        row: usize,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// File extension is not supported
    UnsupportedFormat {
        extension: String,
    },
}

impl fmt::Display for SpreadsheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadsheetError::OpenFailed { path, source } => {
                write!(f, "failed to open spreadsheet ({}): {}", path, source)
            }
            SpreadsheetError::EmptySheet { path } => {
                write!(f, "spreadsheet has no header row: {}", path)
            }
            SpreadsheetError::MissingColumns { columns } => {
                write!(f, "missing required columns: {}", columns.join(", "))
            }
            SpreadsheetError::RowReadFailed { row, source } => {
                write!(f, "failed to read row {}: {}", row, source)
            }
            SpreadsheetError::UnsupportedFormat { extension } => {
                write!(f, "unsupported spreadsheet format: .{}", extension)
            }
        }
    }
}

impl std::error::Error for SpreadsheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpreadsheetError::OpenFailed { source, .. }
            | SpreadsheetError::RowReadFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// Answer-key errors
///
/// Row-level problems (bad letter, missing number) are warnings, not errors;
/// only file-level problems end up here.
#[derive(Debug)]
pub enum KeyError {
    /// Header matches neither shape A nor shape B
    UnrecognizedShape {
        headers: Vec<String>,
    },
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::UnrecognizedShape { headers } => {
                write!(
                    f,
                    "answer key header matches neither (question, letter) nor (module, count): [{}]",
                    headers.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for KeyError {}

/// Per-learner rendering errors
///
/// Caught by the batch loop: the learner is skipped, the batch continues.
#[derive(Debug)]
pub enum RenderError {
    /// A question references a block outside the document
    BlockIndexOutOfRange {
        block: usize,
        block_count: usize,
    },
    /// A question has no options left to place
    EmptyOptions {
        question: String,
    },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::BlockIndexOutOfRange { block, block_count } => {
                write!(
                    f,
                    "question references block {} but the document has {} blocks",
                    block, block_count
                )
            }
            RenderError::EmptyOptions { question } => {
                write!(f, "question '{}' has no options to place", question)
            }
        }
    }
}

impl std::error::Error for RenderError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    /// Environment variable could not be parsed
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// Freeze configuration file could not be parsed
    FreezeParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "environment variable {} has value '{}' which is not a valid {}",
                    var_name, value, expected_type
                )
            }
            ConfigError::FreezeParseFailed { path, source } => {
                write!(f, "failed to parse freeze config ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::FreezeParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

// ========== Conversions from common error types ==========
// No manual From<AppError> for anyhow::Error is needed: anyhow already
// covers every type implementing std::error::Error.

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Spreadsheet(SpreadsheetError::RowReadFailed {
            row: 0,
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(err.to_string())
    }
}

// ========== Convenience constructors ==========

impl AppError {
    /// Template read error
    pub fn template_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Template(TemplateError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// Template parse error
    pub fn template_parse_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Template(TemplateError::ParseFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// Rendered document write error
    pub fn document_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Template(TemplateError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// Spreadsheet open error
    pub fn spreadsheet_open_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Spreadsheet(SpreadsheetError::OpenFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result type alias ==========

/// Application result type
pub type AppResult<T> = Result<T, AppError>;
