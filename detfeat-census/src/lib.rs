//! Canonical census geographies for Detroit.
//!
//! This crate supplies the authoritative set of in-scope geographic
//! identifiers per (census year, grain) pair, backed by prepared per-year
//! block tables. Each table holds one row per census block at least
//! partially intersecting the city boundary, with precomputed inclusion
//! flags at every grain and the block polygon as WKT.
//!
//! # Architecture
//!
//! ```text
//! geos_in_detroit_<year>.csv ──► BlockSet (id-sorted, polygons + flags)
//!                                    │
//!                    ┌───────────────┼────────────────┐
//!                    ▼               ▼                ▼
//!            canonical_ids()     children()     block polygons
//!            (CanonicalIndex)  (refinement join)  (point assignment)
//! ```
//!
//! A [`GeographyProvider`] abstracts over the backing so tests can swap in
//! synthetic block sets; [`DirProvider`] reads the prepared files from a
//! data directory and caches one [`BlockSet`] per year. Repeated reads of
//! the same (year, grain, inclusion) always yield an identical identifier
//! set.
//!
//! # Modules
//!
//! - [`year`]: census years and inclusion criteria
//! - [`block_set`]: in-scope block records and derivations over them
//! - [`provider`]: provider trait and directory-backed implementation
//! - [`index`]: the canonical identifier index
//! - [`error`]: error types

pub mod block_set;
pub mod error;
pub mod index;
pub mod provider;
pub mod year;

pub use block_set::{BlockRecord, BlockSet, InclusionFlags};
pub use error::{CensusError, Result};
pub use index::CanonicalIndex;
pub use provider::{DirProvider, GeographyProvider};
pub use year::{CensusYear, Inclusion, InclusionCriteria};
