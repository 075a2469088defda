//! Error taxonomy for the import and summary pipeline.
//!
//! Field-level problems (unparseable numbers, out-of-range scientific
//! literals) never show up here: they are absorbed into
//! [`CellValue::Text`](crate::data::CellValue::Text) by the loader. Only
//! failures that abort an import or a summary query are modelled.

use std::{io, path::PathBuf};

use thiserror::Error;

pub type EvalResult<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("CSV file not found: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("CSV file {} has no header row", .0.display())]
    EmptyHeader(PathBuf),
    #[error("CSV file {} has no data rows", .0.display())]
    NoDataRows(PathBuf),
    #[error(
        "CSV file has {found} column(s) but {expected} identifier column(s) are configured"
    )]
    TooFewColumns { expected: usize, found: usize },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("aggregation failed: {0}")]
    Aggregation(String),
}
