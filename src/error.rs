//! Error types.
//!
//! Library layers return typed errors (`LoadError`, `ExportError`) so callers can
//! decide whether to halt or recover. The binary boundary folds everything into
//! `AppError`, which carries the process exit code:
//!
//! - `2`: input problems (unreadable file, schema mismatch, invalid values)
//! - `3`: no data to operate on
//! - `4`: export or internal failures

use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Fatal load-time failures. No partial dataset is ever returned alongside one.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Line {line}: missing value for `{column}`")]
    MissingValue { line: usize, column: String },

    #[error("Line {line}: invalid value for `{column}`: '{value}' ({reason})")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
        reason: &'static str,
    },

    #[error("Invalid schema mapping: {0}")]
    Mapping(String),
}

/// Serialization failures while exporting a view. The dataset is left untouched.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV export failed: {0}")]
    CsvBuffer(String),

    #[error("Spreadsheet export failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        AppError::new(2, err.to_string())
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::new(4, err.to_string())
    }
}
