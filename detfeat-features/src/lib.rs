//! Feature construction over census grains.
//!
//! Each civic dataset becomes one feature source: a declared column
//! subset, a minimum geographic grain, and an aggregation. The pipeline
//! takes a source from its raw file to a feature table aligned with the
//! canonical geography index:
//!
//! ```text
//! load ──► cleanse ──► ensure_index ──► feature(grain)
//!  CSV      assign ids,  canonical ids    truncate/join,
//!  subset   standardize, for (year,       group-aggregate,
//!  + filter validate     grain)           reindex + null policy
//! ```
//!
//! Sources are configuration records ([`SourceSpec`]), not subtypes; the
//! per-dataset differences (columns, filters, aggregation, null policy)
//! live in [`catalog`]. Stage results are explicit values held by the
//! pipeline's state machine, so asking for a feature before cleansing is
//! impossible rather than a runtime null.
//!
//! # Modules
//!
//! - [`table`]: typed column-major raw and cleansed tables
//! - [`load`]: chunk-streamed CSV ingestion of a declared column subset
//! - [`aggregate`]: the grain aggregator (group, reindex, null policy)
//! - [`pipeline`]: source lifecycle state machine and feature-set driver
//! - [`catalog`]: the civic dataset source specifications
//! - [`error`]: error types

pub mod aggregate;
pub mod catalog;
pub mod error;
pub mod load;
pub mod pipeline;
pub mod table;

pub use aggregate::{AggFn, Aggregation, GrainAggregator, NullPolicy};
pub use error::{FeatureError, Result};
pub use load::{load_csv, ColumnSpec, RawRow, RowFilter};
pub use pipeline::{
    build_feature_set, FeaturePipeline, PipelineConfig, SourceGeography, SourceSpec,
};
pub use table::{CleansedTable, FeatureColumn, FeatureTable, RawTable, ValueColumn, ValueType};
