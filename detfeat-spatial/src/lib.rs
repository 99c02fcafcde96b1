//! Point-to-census-block assignment.
//!
//! Raw civic datasets locate records by latitude/longitude. This crate
//! grounds those points in the census hierarchy: each point is assigned
//! the identifier of the block polygon containing it, after which the
//! record participates in grain conversion like any block-keyed row.
//!
//! The join is a bounding-box prefilter over the year's block polygons
//! followed by an exact intersects test. Coordinates in these datasets
//! are frequently snapped to parcel corners sitting exactly on shared
//! block edges, so a point can pass the exact test for several polygons;
//! candidates are scanned in ascending identifier order and the first hit
//! wins, making the tie-break the lowest block id rather than an accident
//! of file order. Points outside every block yield no assignment, not an
//! error.
//!
//! # Modules
//!
//! - [`bbox`]: axis-aligned bounding boxes for the prefilter
//! - [`locator`]: the block locator and batch assignment
//! - [`error`]: error types

pub mod bbox;
pub mod error;
pub mod locator;

pub use bbox::BBox;
pub use error::{Result, SpatialError};
pub use locator::{BlockLocator, PointRecord};
