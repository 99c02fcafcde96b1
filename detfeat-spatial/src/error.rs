//! Error types for point assignment.

use thiserror::Error;

/// Point-assignment errors.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// Malformed caller input (duplicate point ids).
    #[error(transparent)]
    Input(#[from] detfeat_core::InputError),

    /// Registry failure while loading block polygons.
    #[error(transparent)]
    Census(#[from] detfeat_census::CensusError),
}

/// Result type for point assignment.
pub type Result<T> = std::result::Result<T, SpatialError>;
