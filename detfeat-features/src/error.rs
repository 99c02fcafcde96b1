//! Error types for feature construction.

use detfeat_core::Grain;
use std::path::PathBuf;
use thiserror::Error;

/// Feature-construction errors.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Raw source file is missing. Local to one source and recoverable:
    /// the feature-set driver skips the source and continues.
    #[error("source file {0:?} is missing; fetch it to build this feature")]
    DataUnavailable(PathBuf),

    /// Cleansed table failed validation (identifier column malformed or
    /// of inconsistent width, column lengths unequal). A source-specific
    /// bug; the source's contribution is aborted rather than coerced.
    #[error("schema error: {0}")]
    Schema(String),

    /// Requested grain conversion cannot be derived from identifiers.
    #[error(transparent)]
    Grain(#[from] detfeat_core::GrainError),

    /// The source declares refinement below its minimum grain unsupported.
    #[error("source {source_name:?} cannot be refined from {min} to {requested}")]
    UnsupportedGrain {
        source_name: String,
        min: Grain,
        requested: Grain,
    },

    /// Malformed caller input.
    #[error(transparent)]
    Input(#[from] detfeat_core::InputError),

    /// Registry failure.
    #[error(transparent)]
    Census(#[from] detfeat_census::CensusError),

    /// Point-assignment failure.
    #[error(transparent)]
    Spatial(#[from] detfeat_spatial::SpatialError),

    /// CSV-level read error in a raw source file.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error reading a raw source file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for feature construction.
pub type Result<T> = std::result::Result<T, FeatureError>;
