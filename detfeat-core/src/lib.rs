//! Census-geography identifier arithmetic.
//!
//! Identifiers are fixed-width decimal codes naming a geography in the
//! census hierarchy (state + county + tract + block-group digit + block
//! digits). The grain fixes the digit width:
//!
//! | grain | digits |
//! |---|---|
//! | tract | 11 |
//! | block group | 12 |
//! | block | 15 |
//!
//! Conversion toward a coarser grain is integer truncation of the trailing
//! digits and is total. The reverse direction is not derivable from an
//! identifier alone: every finer identifier sharing the coarse prefix is a
//! candidate, so refinement requires a join against a ground-truth finer
//! geography set (see the census registry crate). Zero-padding exists only
//! as storage-width normalization for values that already name a geography
//! at their grain, never as refinement.
//!
//! # Modules
//!
//! - [`grain`]: the three grains of the hierarchy
//! - [`geo_id`]: identifier parsing, display, and truncation
//! - [`error`]: error types

pub mod error;
pub mod geo_id;
pub mod grain;

pub use error::{GrainError, InputError};
pub use geo_id::{standardize_id, GeoId};
pub use grain::Grain;
