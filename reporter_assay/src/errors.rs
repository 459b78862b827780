//! Error types for plate parsing and analysis.

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// The sheet does not look like the plate layout we expect.
#[derive(Debug, Error)]
pub enum FormatError {
    /// No 1..12 header with A..H row labels was found.
    #[error(
        "could not locate the 8x12 plate block (A-H rows, 1-12 columns) in {source_name}"
    )]
    BlockNotFound { source_name: String },

    /// A title or file name without a `<n>h` timepoint.
    #[error("could not parse timepoint (e.g. '3h') from {text:?}")]
    Timepoint { text: String },
}

/// The well mapping does not cover the readings.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("mapping file must include columns {missing:?}")]
    MissingColumns { missing: Vec<String> },

    #[error("unmapped wells found in mapping file: {}", wells.join(", "))]
    UnmappedWells { wells: Vec<String> },

    #[error("wells mapped more than once: {}", wells.join(", "))]
    DuplicateWells { wells: Vec<String> },
}

#[derive(Debug, Error)]
pub enum AssayError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// A full scan produced nothing at all.
    #[error("parsed 0 readings from {source_name}; is it in the stacked-plates format?")]
    EmptyResult { source_name: String },

    #[error("invalid plate geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("failed to read spreadsheet {path}: {message}")]
    Spreadsheet { path: PathBuf, message: String },

    #[error("unsupported input file {path}")]
    UnsupportedFile { path: PathBuf },

    #[error("failed to draw chart {path}: {message}")]
    Plot { path: PathBuf, message: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type AssayResult<T> = Result<T, AssayError>;
