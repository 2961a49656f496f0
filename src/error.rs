// ⚠️ Error taxonomy for a single analysis invocation
// Undefined arithmetic is NOT an error here - it flows through as `None`

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElasticityError {
    /// A required column is absent from a source table
    #[error("missing required column `{column}` in {table} table")]
    MissingInputColumn { table: &'static str, column: String },

    /// A trade record lacks the field the grouping dimension needs
    #[error("trade record for year {year} has no {field} value")]
    MissingCategory { year: i32, field: &'static str },

    #[error("digit truncation level must be between 1 and {max}, got {digit}")]
    InvalidDigit { digit: u32, max: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse {table} row at line {line}: {source}")]
    Row {
        table: &'static str,
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Destination unwritable; raised before any output file is touched
    /// when the directory itself is the problem
    #[error("failed to write output to {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ElasticityError>;
