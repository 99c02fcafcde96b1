//! Error types for the census geography registry.

use std::path::PathBuf;
use thiserror::Error;

/// Registry errors.
#[derive(Debug, Error)]
pub enum CensusError {
    /// Prepared geography file is missing. Local and recoverable: fetch
    /// the prepared block table for the year and rerun.
    #[error("prepared geography file {0:?} is missing; fetch it before building features")]
    DataUnavailable(PathBuf),

    /// Backing table is malformed (missing column, bad flag, bad id).
    #[error("geography table format error: {0}")]
    Format(String),

    /// WKT geometry column failed to parse.
    #[error("WKT parse error: {0}")]
    WktParse(String),

    /// CSV-level read error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed caller input.
    #[error(transparent)]
    Input(#[from] detfeat_core::InputError),

    /// Invalid grain conversion while deriving identifiers.
    #[error(transparent)]
    Grain(#[from] detfeat_core::GrainError),

    /// I/O error reading a backing file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, CensusError>;
