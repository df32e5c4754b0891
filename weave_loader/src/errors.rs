use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;
use weave_events::EventError;

use crate::settings::SettingsError;

/// The unified error type for the `weave_loader` crate.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The request cannot be served as given (no variable, empty country
    /// list, unknown frequency, ...). Not retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No source file matched the request, or none of the matching files
    /// could be read.
    #[error("No source data: {0}")]
    NotFound(String),

    /// A file name does not follow the positional field layout.
    #[error("Cannot parse source file name {path}: {reason}")]
    Filename { path: PathBuf, reason: String },

    /// A source file could not be opened.
    #[error("Cannot read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV parser rejected a record.
    #[error("CSV parse error in {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A cell or date could not be interpreted.
    #[error("Bad value in {path} at row {row}: {message}")]
    Parse {
        path: PathBuf,
        row: usize,
        message: String,
    },

    /// The file has no `Date` column.
    #[error("Source file {path} has no Date column")]
    MissingDateColumn { path: PathBuf },

    /// A cache artifact exists but does not hold a dense cube.
    #[error("Cache artifact {path} is malformed: {reason}")]
    CorruptCache { path: PathBuf, reason: String },

    /// Persisting a cache artifact failed.
    #[error("Cannot write cache artifact {path}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A generic I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// An error from the Polars library.
    #[error("Polars operation failed")]
    Polars(#[from] PolarsError),

    /// The event engine rejected an array.
    #[error(transparent)]
    Events(#[from] EventError),

    /// Settings could not be resolved.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
