//! Error types for identifier arithmetic.

use crate::grain::Grain;
use thiserror::Error;

/// Invalid grain conversions.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GrainError {
    /// Refinement was requested from an identifier alone. A coarse
    /// identifier does not determine its children; join against a finer
    /// geography set instead.
    #[error("cannot refine a {from} identifier to {to} without a finer geography join")]
    RefineWithoutJoin { from: Grain, to: Grain },
}

/// Malformed caller input, rejected at the boundary of public operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Grain name not one of "block", "block group", "tract".
    #[error("unknown grain {0:?}; expected one of \"block\", \"block group\", \"tract\"")]
    UnknownGrain(String),

    /// Inclusion criteria name not one of "intersects", "within".
    #[error("unknown inclusion criteria {0:?}; expected \"intersects\" or \"within\"")]
    UnknownCriteria(String),

    /// No prepared geographies exist for the requested census year.
    #[error("census year {0} has no prepared geographies; expected 2010 or 2020")]
    UnsupportedYear(u16),

    /// Identifier string is not a fixed-width digit code at the grain.
    #[error("identifier {id:?} is not a valid {grain} code")]
    MalformedId { id: String, grain: Grain },

    /// Numeric identifier has the wrong digit count for the grain.
    #[error("numeric identifier {value} does not have the digit width of a {grain} code")]
    IdWidth { value: u64, grain: Grain },

    /// Point ids must be unique within one assignment call.
    #[error("duplicate point id {0}")]
    DuplicatePointId(i64),
}
