//! Source lifecycle and the feature-set driver.
//!
//! A [`FeaturePipeline`] walks one source through
//! `load → cleanse → ensure_index → feature(grain)`. Stage results are
//! explicit values in a forward-only state machine; re-running a stage is
//! a no-op, and each public entry point triggers the stages it needs.
//! The canonical index is cached per grain and rebuilt only when a
//! different grain is requested.
//!
//! Sources are [`SourceSpec`] configuration records. The per-dataset
//! variation — columns, filters, derived columns, aggregation, null
//! policy — lives in the record, not in subtypes; see [`crate::catalog`].

use crate::aggregate::{aggregate_table, Aggregation, NullPolicy};
use crate::error::{FeatureError, Result};
use crate::load::{load_csv, ColumnSpec, RowFilter};
use crate::table::{CleansedTable, FeatureTable, RawTable};
use detfeat_census::{CanonicalIndex, CensusYear, GeographyProvider, Inclusion};
use detfeat_core::{standardize_id, GeoId, Grain};
use detfeat_spatial::{BlockLocator, PointRecord};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// How a source's rows are located geographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceGeography {
    /// Raw latitude/longitude points; assignment grounds them at block
    /// grain.
    Points {
        lat: &'static str,
        lon: &'static str,
        oid: &'static str,
    },
    /// Rows already keyed by an identifier at a declared grain.
    Keyed {
        grain: Grain,
        id_column: &'static str,
    },
}

impl SourceGeography {
    /// The finest grain this source can express natively.
    pub fn min_grain(&self) -> Grain {
        match self {
            SourceGeography::Points { .. } => Grain::Block,
            SourceGeography::Keyed { grain, .. } => *grain,
        }
    }
}

/// Rewrites a raw identifier cell before standardization (e.g. stripping
/// the `1400000US` prefix of census product GEO_IDs). `None` drops the
/// row.
pub type IdNormalizer = fn(&str) -> Option<String>;

/// Derives columns on the cleansed table (indicator variables and the
/// like) before aggregation.
pub type DeriveFn = fn(&mut CleansedTable) -> Result<()>;

/// Everything that distinguishes one source from another.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    /// Short machine name, used in logs and failure reports.
    pub name: &'static str,
    /// Path of the raw file, relative to the configured data directory.
    pub filename: &'static str,
    /// Declared column subset and types.
    pub columns: Vec<ColumnSpec>,
    /// How rows are located.
    pub geography: SourceGeography,
    /// Keep-row predicate applied while streaming the file.
    pub row_filter: Option<RowFilter>,
    /// Identifier rewrite for keyed sources.
    pub id_normalizer: Option<IdNormalizer>,
    /// Post-cleanse derived columns.
    pub derive: Option<DeriveFn>,
    /// Features produced from this source.
    pub aggregations: Vec<Aggregation>,
    /// Fill rule after reindexing.
    pub null_policy: NullPolicy,
    /// Whether a finer grain than `min_grain` may be served by imputing
    /// across canonical children. Sources where that approximation is
    /// meaningless opt out and fail fast instead.
    pub refine_by_join: bool,
    /// Rows to drop immediately after the header.
    pub skip_data_rows: usize,
}

/// Shared pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding raw source files and prepared geographies.
    pub data_dir: PathBuf,
    /// Reference census year for geographies and assignment.
    pub census_year: CensusYear,
    /// Membership rule for the canonical index.
    pub inclusion: Inclusion,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            census_year: CensusYear::Y2020,
            inclusion: Inclusion::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Set the reference census year.
    pub fn with_census_year(mut self, year: CensusYear) -> Self {
        self.census_year = year;
        self
    }

    /// Set the canonical-index membership rule.
    pub fn with_inclusion(mut self, inclusion: Inclusion) -> Self {
        self.inclusion = inclusion;
        self
    }
}

enum Stage {
    Start,
    Loaded(RawTable),
    Cleansed(CleansedTable),
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Loaded(_) => "loaded",
            Stage::Cleansed(_) => "cleansed",
        }
    }
}

/// One source walking toward a feature table.
pub struct FeaturePipeline {
    spec: SourceSpec,
    config: PipelineConfig,
    provider: Arc<dyn GeographyProvider>,
    stage: Stage,
    index: Option<Arc<CanonicalIndex>>,
}

impl FeaturePipeline {
    pub fn new(
        spec: SourceSpec,
        config: PipelineConfig,
        provider: Arc<dyn GeographyProvider>,
    ) -> Self {
        Self {
            spec,
            config,
            provider,
            stage: Stage::Start,
            index: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn spec(&self) -> &SourceSpec {
        &self.spec
    }

    /// Lifecycle stage, for logs and diagnostics.
    pub fn stage_name(&self) -> &'static str {
        self.stage.name()
    }

    /// Read the raw file. No-op when already loaded or cleansed.
    pub fn load(&mut self) -> Result<()> {
        if !matches!(self.stage, Stage::Start) {
            return Ok(());
        }
        let path = self.config.data_dir.join(self.spec.filename);
        let _span = tracing::debug_span!("load", source = self.spec.name).entered();
        let raw = load_csv(
            &path,
            &self.spec.columns,
            self.spec.row_filter,
            self.spec.skip_data_rows,
        )?;
        self.stage = Stage::Loaded(raw);
        Ok(())
    }

    /// Assign identifiers, standardize, validate. No-op when already
    /// cleansed; loads first when needed.
    pub fn cleanse(&mut self) -> Result<()> {
        self.load()?;
        let raw = match std::mem::replace(&mut self.stage, Stage::Start) {
            Stage::Start => unreachable!("load() always leaves data behind"),
            Stage::Cleansed(table) => {
                self.stage = Stage::Cleansed(table);
                return Ok(());
            }
            Stage::Loaded(raw) => raw,
        };

        let _span = tracing::debug_span!("cleanse", source = self.spec.name).entered();
        let mut cleansed = match self.spec.geography {
            SourceGeography::Points { lat, lon, oid } => {
                self.cleanse_points(&raw, lat, lon, oid)?
            }
            SourceGeography::Keyed { grain, id_column } => {
                self.cleanse_keyed(&raw, grain, id_column)?
            }
        };

        if let Some(derive) = self.spec.derive {
            derive(&mut cleansed)?;
        }

        tracing::info!(
            source = self.spec.name,
            rows_in = raw.num_rows(),
            rows_out = cleansed.len(),
            "cleansed source"
        );
        self.stage = Stage::Cleansed(cleansed);
        Ok(())
    }

    fn cleanse_points(
        &self,
        raw: &RawTable,
        lat: &str,
        lon: &str,
        oid: &str,
    ) -> Result<CleansedTable> {
        let lat_col = raw.require_column(lat)?;
        let lon_col = raw.require_column(lon)?;
        let oid_col = raw.require_column(oid)?;

        let mut points = Vec::new();
        let mut point_rows = Vec::new();
        for i in 0..raw.num_rows() {
            match (oid_col.get_i64(i), lat_col.get_f64(i), lon_col.get_f64(i)) {
                (Some(oid), Some(lat), Some(lon)) => {
                    points.push(PointRecord::new(oid, lat, lon));
                    point_rows.push(i);
                }
                _ => {}
            }
        }
        let no_coords = raw.num_rows() - points.len();
        if no_coords > 0 {
            tracing::warn!(
                source = self.spec.name,
                dropped = no_coords,
                "rows without usable id/coordinates dropped before assignment"
            );
        }

        let locator = BlockLocator::new(self.provider.as_ref(), self.config.census_year)?;
        let assigned = locator.assign(&points)?;

        let mut ids: Vec<GeoId> = Vec::with_capacity(points.len());
        let mut kept_rows = Vec::with_capacity(points.len());
        for (point, &row) in points.iter().zip(&point_rows) {
            if let Some(Some(id)) = assigned.get(&point.oid) {
                ids.push(*id);
                kept_rows.push(row);
            }
        }
        let unassigned = points.len() - ids.len();
        if unassigned > 0 {
            tracing::warn!(
                source = self.spec.name,
                dropped = unassigned,
                "points outside every in-scope block dropped"
            );
        }

        CleansedTable::new(Grain::Block, ids, raw.filter_rows(&kept_rows))
    }

    fn cleanse_keyed(
        &self,
        raw: &RawTable,
        grain: Grain,
        id_column: &str,
    ) -> Result<CleansedTable> {
        let col = raw.require_column(id_column)?;

        let mut ids: Vec<GeoId> = Vec::new();
        let mut kept_rows = Vec::new();
        let mut padded_count = 0usize;
        let mut null_ids = 0usize;
        for i in 0..raw.num_rows() {
            let repr = col.get_id_repr(i).and_then(|r| match self.spec.id_normalizer {
                Some(normalize) => normalize(&r),
                None => Some(r),
            });
            let Some(repr) = repr else {
                null_ids += 1;
                continue;
            };
            let (id, was_padded) = standardize_id(&repr, grain)
                .map_err(|e| FeatureError::Schema(e.to_string()))?;
            if was_padded {
                padded_count += 1;
            }
            ids.push(id);
            kept_rows.push(i);
        }

        if null_ids > 0 {
            tracing::warn!(
                source = self.spec.name,
                dropped = null_ids,
                "rows with null identifiers dropped"
            );
        }
        if padded_count > 0 {
            tracing::warn!(
                source = self.spec.name,
                padded = padded_count,
                "identifiers below storage width; right-padded with zeros"
            );
        }

        CleansedTable::new(grain, ids, raw.filter_rows(&kept_rows))
    }

    /// The canonical index for a grain, building it lazily and caching.
    /// A repeated request at the same grain is a cache hit; a different
    /// grain rebuilds.
    pub fn ensure_index(&mut self, grain: Grain) -> Result<Arc<CanonicalIndex>> {
        match &self.index {
            Some(index) if index.grain() == grain => Ok(Arc::clone(index)),
            _ => {
                let index = Arc::new(CanonicalIndex::build(
                    self.provider.as_ref(),
                    self.config.census_year,
                    grain,
                    self.config.inclusion,
                )?);
                self.index = Some(Arc::clone(&index));
                Ok(index)
            }
        }
    }

    /// Build this source's feature table at a grain, triggering any
    /// missing lifecycle stages.
    pub fn feature(&mut self, grain: Grain) -> Result<FeatureTable> {
        self.cleanse()?;

        // Refinement support is a per-source declaration; refuse before
        // touching the index or aggregating.
        let min_grain = self.spec.geography.min_grain();
        if grain.is_finer_than(min_grain) && !self.spec.refine_by_join {
            return Err(FeatureError::UnsupportedGrain {
                source_name: self.spec.name.to_string(),
                min: min_grain,
                requested: grain,
            });
        }

        let index = self.ensure_index(grain)?;
        let Stage::Cleansed(table) = &self.stage else {
            unreachable!("cleanse() always leaves a cleansed table behind");
        };
        aggregate_table(table, &self.spec.aggregations, &index, self.spec.null_policy)
    }
}

/// Build features for many sources, tolerating per-source failures.
///
/// A missing raw file is an expected local condition — the source is
/// skipped with a warning and the rest of the set proceeds. Any other
/// failure likewise aborts only that source's contribution; the error is
/// reported alongside the built tables rather than coercing bad data
/// through.
pub fn build_feature_set(
    pipelines: &mut [FeaturePipeline],
    grain: Grain,
) -> (Vec<FeatureTable>, Vec<(String, FeatureError)>) {
    let mut tables = Vec::new();
    let mut failures = Vec::new();
    for pipeline in pipelines.iter_mut() {
        match pipeline.feature(grain) {
            Ok(table) => tables.push(table),
            Err(err @ FeatureError::DataUnavailable(_)) => {
                tracing::warn!(source = pipeline.name(), %err, "skipping source");
                failures.push((pipeline.name().to_string(), err));
            }
            Err(err) => {
                tracing::error!(source = pipeline.name(), %err, "source failed");
                failures.push((pipeline.name().to_string(), err));
            }
        }
    }
    (tables, failures)
}
