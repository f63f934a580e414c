//! Error types for malformed task data.
//!
//! Any of these aborts the whole load or aggregation; there are no
//! partial results.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or deriving the task table.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Input not found: {0}")]
    InputNotFound(PathBuf),

    #[error("No CSV files found in {0}")]
    NoCsvFiles(PathBuf),

    #[error("Missing required column '{column}' in {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("Row {row}: invalid date '{value}' in column '{column}'")]
    InvalidDate {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Row {row}: invalid number '{value}' in column '{column}'")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Row {row}: negative value {value} in column '{column}'")]
    NegativeValue {
        row: usize,
        column: String,
        value: f64,
    },

    #[error("{location}: date {date} is before the sprint anchor {anchor}")]
    DateBeforeAnchor {
        location: String,
        date: NaiveDate,
        anchor: NaiveDate,
    },

    #[error("Sprint length must be at least 1 day")]
    InvalidSprintLength,

    #[error("Task table is empty")]
    EmptyTable,

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad data in {path}")]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<DataError>,
    },
}

impl DataError {
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        DataError::Csv {
            path: path.into(),
            source,
        }
    }

    /// Attach the file an error came from. Errors that already name
    /// their file are returned unchanged.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            DataError::MissingColumn { .. } | DataError::Csv { .. } | DataError::InFile { .. } => {
                self
            }
            other => DataError::InFile {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }
}
