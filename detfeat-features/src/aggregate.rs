//! Grain aggregation: group, reduce, reindex, fill.
//!
//! The common direction rolls fine identifiers up to a coarser target:
//! truncate each row's identifier, reduce per group, then reindex against
//! the canonical index so every canonical identifier appears exactly
//! once. The opposite direction — a coarse source asked for at a finer
//! grain — reduces at the source's native grain and then imputes the
//! coarse value uniformly across the canonical children. That is an
//! approximation of the underlying fact, not a refinement of it; the
//! canonical index supplies the ground-truth children, identifiers alone
//! cannot.
//!
//! [`GrainAggregator`] is push-based so a chunk-streamed read can feed it
//! row by row without materializing the source table.

use crate::error::{FeatureError, Result};
use crate::table::{CleansedTable, FeatureColumn, FeatureTable};
use detfeat_census::CanonicalIndex;
use detfeat_core::{GeoId, Grain};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// How nulls introduced by reindexing are handled.
///
/// Count-style features fill with zero: an absent geography truly had no
/// observations. Rate-style features keep the null: zero would misstate
/// "no data" as a structural zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    FillZero,
    Preserve,
}

impl NullPolicy {
    fn apply(self, values: &mut [Option<f64>]) {
        if self == NullPolicy::FillZero {
            for v in values.iter_mut() {
                if v.is_none() {
                    *v = Some(0.0);
                }
            }
        }
    }
}

/// Per-group reduction.
#[derive(Clone, Copy)]
pub enum AggFn {
    /// Count of non-null values.
    Count,
    /// Sum of non-null values (zero when the group has only nulls).
    Sum,
    /// Mean of non-null values (null when the group has only nulls).
    Mean,
    /// Count of distinct non-null values.
    NUnique,
    /// Caller-supplied reduction over the group's non-null values.
    Custom(fn(&[f64]) -> Option<f64>),
}

impl std::fmt::Debug for AggFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggFn::Count => f.write_str("Count"),
            AggFn::Sum => f.write_str("Sum"),
            AggFn::Mean => f.write_str("Mean"),
            AggFn::NUnique => f.write_str("NUnique"),
            AggFn::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One feature derived from one value column.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// Value column of the cleansed table to reduce.
    pub column: String,
    /// Name of the resulting feature.
    pub feature: String,
    /// The reduction.
    pub agg: AggFn,
}

impl Aggregation {
    pub fn new(column: impl Into<String>, feature: impl Into<String>, agg: AggFn) -> Self {
        Self {
            column: column.into(),
            feature: feature.into(),
            agg,
        }
    }
}

enum Accum {
    Count(u64),
    Sum(f64),
    Mean { sum: f64, n: u64 },
    NUnique(FxHashSet<u64>),
    Custom(Vec<f64>),
}

impl Accum {
    fn new(agg: AggFn) -> Self {
        match agg {
            AggFn::Count => Accum::Count(0),
            AggFn::Sum => Accum::Sum(0.0),
            AggFn::Mean => Accum::Mean { sum: 0.0, n: 0 },
            AggFn::NUnique => Accum::NUnique(FxHashSet::default()),
            AggFn::Custom(_) => Accum::Custom(Vec::new()),
        }
    }

    fn add(&mut self, value: f64) {
        match self {
            Accum::Count(n) => *n += 1,
            Accum::Sum(sum) => *sum += value,
            Accum::Mean { sum, n } => {
                *sum += value;
                *n += 1;
            }
            Accum::NUnique(seen) => {
                seen.insert(value.to_bits());
            }
            Accum::Custom(values) => values.push(value),
        }
    }

    fn value(&self, agg: AggFn) -> Option<f64> {
        match self {
            Accum::Count(n) => Some(*n as f64),
            Accum::Sum(sum) => Some(*sum),
            Accum::Mean { sum, n } => (*n > 0).then(|| sum / *n as f64),
            Accum::NUnique(seen) => Some(seen.len() as f64),
            Accum::Custom(values) => match agg {
                AggFn::Custom(f) => f(values),
                _ => None,
            },
        }
    }
}

/// Push-based group-by at a target grain.
///
/// Feed `(identifier, value)` pairs — from a whole table or a chunked
/// read — then reindex against a canonical index. Identifiers are
/// truncated to the target grain on the way in, so only the per-group
/// accumulators stay resident.
pub struct GrainAggregator {
    target: Grain,
    agg: AggFn,
    groups: FxHashMap<GeoId, Accum>,
}

impl GrainAggregator {
    pub fn new(target: Grain, agg: AggFn) -> Self {
        Self {
            target,
            agg,
            groups: FxHashMap::default(),
        }
    }

    /// The grain rows are grouped at.
    pub fn target(&self) -> Grain {
        self.target
    }

    /// Number of groups accumulated so far.
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Accumulate one row. The identifier must be at the target grain or
    /// finer; a coarser identifier cannot be refined here.
    pub fn push(&mut self, id: GeoId, value: Option<f64>) -> Result<()> {
        let group = id.to_grain(self.target)?;
        let accum = self
            .groups
            .entry(group)
            .or_insert_with(|| Accum::new(self.agg));
        if let Some(v) = value {
            accum.add(v);
        }
        Ok(())
    }

    /// Reduce to a per-group map at the target grain.
    pub fn into_values(self) -> FxHashMap<GeoId, Option<f64>> {
        let agg = self.agg;
        self.groups
            .into_iter()
            .map(|(id, accum)| (id, accum.value(agg)))
            .collect()
    }

    /// Reindex against a canonical index and apply the null policy.
    ///
    /// The result has exactly one value per canonical identifier; groups
    /// outside the index are dropped, canonical identifiers without a
    /// group become nulls for the policy to fill or keep.
    pub fn finish(self, index: &CanonicalIndex, policy: NullPolicy) -> Result<Vec<Option<f64>>> {
        if index.grain() != self.target {
            return Err(FeatureError::Schema(format!(
                "aggregated at {} grain but index is at {} grain",
                self.target,
                index.grain()
            )));
        }
        let grouped = self.into_values();
        let mut values: Vec<Option<f64>> = index
            .iter()
            .map(|id| grouped.get(&id).copied().flatten())
            .collect();
        policy.apply(&mut values);
        Ok(values)
    }
}

/// Aggregate a cleansed table against a canonical index.
///
/// Dispatches on direction: rolls up when the index grain is coarser than
/// or equal to the table grain, imputes down across canonical children
/// otherwise. One output column per aggregation.
pub fn aggregate_table(
    table: &CleansedTable,
    aggregations: &[Aggregation],
    index: &Arc<CanonicalIndex>,
    policy: NullPolicy,
) -> Result<FeatureTable> {
    let _span = tracing::debug_span!(
        "aggregate",
        source_grain = %table.grain(),
        target_grain = %index.grain(),
        rows = table.len(),
    )
    .entered();

    let mut columns = Vec::with_capacity(aggregations.len());
    for spec in aggregations {
        let values = table.column_f64(&spec.column)?;
        let rows = table.ids().iter().copied().zip(values);

        let column_values = if index.grain().is_coarser_or_equal(table.grain()) {
            roll_up(rows, spec.agg, index, policy)?
        } else {
            impute_down(rows, spec.agg, table.grain(), index, policy)?
        };

        columns.push(FeatureColumn {
            name: spec.feature.clone(),
            values: column_values,
        });
    }
    FeatureTable::new(Arc::clone(index), columns)
}

fn roll_up(
    rows: impl Iterator<Item = (GeoId, Option<f64>)>,
    agg: AggFn,
    index: &CanonicalIndex,
    policy: NullPolicy,
) -> Result<Vec<Option<f64>>> {
    let mut aggregator = GrainAggregator::new(index.grain(), agg);
    for (id, value) in rows {
        aggregator.push(id, value)?;
    }
    aggregator.finish(index, policy)
}

/// Reduce at the source's native grain, then spread each coarse value
/// across the canonical identifiers rolling up to it.
fn impute_down(
    rows: impl Iterator<Item = (GeoId, Option<f64>)>,
    agg: AggFn,
    native: Grain,
    index: &CanonicalIndex,
    policy: NullPolicy,
) -> Result<Vec<Option<f64>>> {
    let mut aggregator = GrainAggregator::new(native, agg);
    for (id, value) in rows {
        aggregator.push(id, value)?;
    }
    let native_values = aggregator.into_values();

    let mut values: Vec<Option<f64>> = index
        .iter()
        .map(|child| {
            // The index grain is finer than the native grain here, so the
            // truncation is total.
            let parent = child.to_grain(native)?;
            Ok(native_values.get(&parent).copied().flatten())
        })
        .collect::<Result<_>>()?;
    policy.apply(&mut values);
    Ok(values)
}
