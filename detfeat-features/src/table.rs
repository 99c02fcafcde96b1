//! Typed column-major tables.
//!
//! Data is stored in typed `Vec` per column, not per-row; all access goes
//! through the [`ValueColumn`] enum so there is no `dyn Any` in the data
//! path. Three primitive column types cover the civic datasets: float,
//! int, and string.
//!
//! A [`RawTable`] is the opinionated load of a source file (declared
//! column subset, lenient cell parsing). A [`CleansedTable`] additionally
//! carries one identifier per row at the source's minimum grain, with the
//! identifier invariants checked at construction: once a value of this
//! type exists, every row has a well-formed identifier of uniform width.

use crate::error::{FeatureError, Result};
use detfeat_census::CanonicalIndex;
use detfeat_core::{GeoId, Grain};
use std::sync::Arc;

/// Primitive column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Float,
    Int,
    Str,
}

/// Column storage: typed arrays with nullable values.
#[derive(Debug, Clone)]
pub enum ValueColumn {
    Float(Vec<Option<f64>>),
    Int(Vec<Option<i64>>),
    Str(Vec<Option<String>>),
}

impl ValueColumn {
    /// Create an empty column of the given type.
    pub fn empty(ty: ValueType) -> Self {
        match ty {
            ValueType::Float => Self::Float(Vec::new()),
            ValueType::Int => Self::Int(Vec::new()),
            ValueType::Str => Self::Str(Vec::new()),
        }
    }

    /// Number of rows in this column.
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The column's type.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Float(_) => ValueType::Float,
            Self::Int(_) => ValueType::Int,
            Self::Str(_) => ValueType::Str,
        }
    }

    /// Parse a raw CSV cell and append it. Empty cells and cells that do
    /// not parse at the column type become null; returns whether the cell
    /// was unparseable (for data-quality accounting).
    pub fn push_raw(&mut self, cell: &str) -> bool {
        let trimmed = cell.trim();
        match self {
            Self::Float(v) => {
                if trimmed.is_empty() {
                    v.push(None);
                    false
                } else {
                    match trimmed.parse::<f64>() {
                        Ok(x) if x.is_finite() => {
                            v.push(Some(x));
                            false
                        }
                        _ => {
                            v.push(None);
                            true
                        }
                    }
                }
            }
            Self::Int(v) => {
                if trimmed.is_empty() {
                    v.push(None);
                    false
                } else {
                    match trimmed.parse::<i64>() {
                        Ok(x) => {
                            v.push(Some(x));
                            false
                        }
                        _ => {
                            v.push(None);
                            true
                        }
                    }
                }
            }
            Self::Str(v) => {
                if trimmed.is_empty() {
                    v.push(None);
                } else {
                    v.push(Some(trimmed.to_string()));
                }
                false
            }
        }
    }

    /// Check if the value at `idx` is null (or out of range).
    pub fn is_null(&self, idx: usize) -> bool {
        match self {
            Self::Float(v) => v.get(idx).map_or(true, |x| x.is_none()),
            Self::Int(v) => v.get(idx).map_or(true, |x| x.is_none()),
            Self::Str(v) => v.get(idx).map_or(true, |x| x.is_none()),
        }
    }

    /// Numeric view of the value at `idx`; ints widen to float, strings
    /// are never numeric.
    pub fn get_f64(&self, idx: usize) -> Option<f64> {
        match self {
            Self::Float(v) => v.get(idx).copied().flatten(),
            Self::Int(v) => v.get(idx).copied().flatten().map(|x| x as f64),
            Self::Str(_) => None,
        }
    }

    /// Integer value at `idx` (returns `None` for other types or null).
    pub fn get_i64(&self, idx: usize) -> Option<i64> {
        match self {
            Self::Int(v) => v.get(idx).copied().flatten(),
            _ => None,
        }
    }

    /// String value at `idx` (returns `None` for other types or null).
    pub fn get_str(&self, idx: usize) -> Option<&str> {
        match self {
            Self::Str(v) => v.get(idx).and_then(|x| x.as_deref()),
            _ => None,
        }
    }

    /// Render the value at `idx` as the digit string an identifier column
    /// holds: strings pass through, ints print, floats print only when
    /// integral. `None` for nulls.
    pub fn get_id_repr(&self, idx: usize) -> Option<String> {
        match self {
            Self::Str(v) => v.get(idx).and_then(|x| x.clone()),
            Self::Int(v) => v.get(idx).copied().flatten().map(|x| x.to_string()),
            Self::Float(v) => v.get(idx).copied().flatten().and_then(|x| {
                let rounded = x.round();
                ((x - rounded).abs() < 1e-6 && x > 0.0).then(|| format!("{:.0}", rounded))
            }),
        }
    }

    /// Keep only the rows at `indices`, in order.
    pub fn filter_rows(&self, indices: &[usize]) -> Self {
        match self {
            Self::Float(v) => Self::Float(indices.iter().map(|&i| v[i]).collect()),
            Self::Int(v) => Self::Int(indices.iter().map(|&i| v[i]).collect()),
            Self::Str(v) => Self::Str(indices.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

/// Column-major table produced by a source's load step.
#[derive(Debug, Clone)]
pub struct RawTable {
    names: Vec<String>,
    columns: Vec<ValueColumn>,
    num_rows: usize,
}

impl RawTable {
    /// Assemble from named columns; all columns must have equal length.
    pub fn new(names: Vec<String>, columns: Vec<ValueColumn>) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(FeatureError::Schema(format!(
                "{} column names for {} columns",
                names.len(),
                columns.len()
            )));
        }
        let num_rows = columns.first().map_or(0, |c| c.len());
        for (name, col) in names.iter().zip(&columns) {
            if col.len() != num_rows {
                return Err(FeatureError::Schema(format!(
                    "column {name:?} has {} rows, expected {num_rows}",
                    col.len()
                )));
            }
        }
        Ok(Self {
            names,
            columns,
            num_rows,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<&ValueColumn> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    /// Column by name, or a schema error naming the missing column.
    pub fn require_column(&self, name: &str) -> Result<&ValueColumn> {
        self.column(name)
            .ok_or_else(|| FeatureError::Schema(format!("missing column {name:?}")))
    }

    /// Keep only the rows at `indices`, in order.
    pub fn filter_rows(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| c.filter_rows(indices))
                .collect(),
            num_rows: indices.len(),
        }
    }
}

/// Strictly parse raw identifier strings at a grain.
///
/// Every string must already be at the grain's exact digit width; mixed
/// or wrong widths are a schema error, not something to coerce here.
/// Storage-width padding belongs to the cleanse step
/// ([`detfeat_core::standardize_id`]), before this check.
pub fn validate_ids(grain: Grain, raw: &[String]) -> Result<Vec<GeoId>> {
    raw.iter()
        .map(|s| {
            GeoId::parse(s, grain).map_err(|_| {
                FeatureError::Schema(format!(
                    "identifier {s:?} is not a {}-digit {grain} code",
                    grain.digits()
                ))
            })
        })
        .collect()
}

/// A raw table after cleansing: one identifier per row at the source's
/// minimum grain, plus the surviving value columns.
#[derive(Debug, Clone)]
pub struct CleansedTable {
    grain: Grain,
    ids: Vec<GeoId>,
    table: RawTable,
}

impl CleansedTable {
    /// Assemble from parsed identifiers and value columns. Identifier
    /// grain uniformity and column lengths are checked here; every later
    /// stage can rely on them.
    pub fn new(grain: Grain, ids: Vec<GeoId>, table: RawTable) -> Result<Self> {
        if let Some(bad) = ids.iter().find(|id| id.grain() != grain) {
            return Err(FeatureError::Schema(format!(
                "identifier {bad} is at {} grain, expected {grain}",
                bad.grain()
            )));
        }
        if ids.len() != table.num_rows() {
            return Err(FeatureError::Schema(format!(
                "{} identifiers for {} rows",
                ids.len(),
                table.num_rows()
            )));
        }
        Ok(Self { grain, ids, table })
    }

    /// Assemble from raw identifier strings, validating width.
    pub fn from_raw_ids(grain: Grain, raw_ids: &[String], table: RawTable) -> Result<Self> {
        let ids = validate_ids(grain, raw_ids)?;
        Self::new(grain, ids, table)
    }

    /// The grain every identifier is expressed at.
    pub fn grain(&self) -> Grain {
        self.grain
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Row identifiers, parallel to the value columns.
    pub fn ids(&self) -> &[GeoId] {
        &self.ids
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<&ValueColumn> {
        self.table.column(name)
    }

    /// Numeric view of a column; strings are not aggregatable.
    pub fn column_f64(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let col = self.table.require_column(name)?;
        if col.value_type() == ValueType::Str {
            return Err(FeatureError::Schema(format!(
                "column {name:?} is a string column and cannot be aggregated"
            )));
        }
        Ok((0..col.len()).map(|i| col.get_f64(i)).collect())
    }

    /// Append a derived float column (indicator variables and the like).
    pub fn add_float_column(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<()> {
        if values.len() != self.len() {
            return Err(FeatureError::Schema(format!(
                "derived column {name:?} has {} rows, expected {}",
                values.len(),
                self.len()
            )));
        }
        self.table.names.push(name.to_string());
        self.table.columns.push(ValueColumn::Float(values));
        Ok(())
    }
}

/// One named feature aligned to a canonical index.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Aggregated feature values for every canonical identifier.
///
/// Exactly one row per index member: missing source data is an explicit
/// null (or the null policy's fill), never an absent row, so per-source
/// tables concatenate on an identical index downstream.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    index: Arc<CanonicalIndex>,
    columns: Vec<FeatureColumn>,
}

impl FeatureTable {
    /// Assemble, checking every column covers the index exactly.
    pub fn new(index: Arc<CanonicalIndex>, columns: Vec<FeatureColumn>) -> Result<Self> {
        for col in &columns {
            if col.values.len() != index.len() {
                return Err(FeatureError::Schema(format!(
                    "feature {:?} has {} values for an index of {}",
                    col.name,
                    col.values.len(),
                    index.len()
                )));
            }
        }
        Ok(Self { index, columns })
    }

    /// The canonical index this table is aligned to.
    pub fn index(&self) -> &Arc<CanonicalIndex> {
        &self.index
    }

    /// Rows, always equal to the index cardinality.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    /// Values of a feature by name.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Value of a feature at a canonical identifier.
    pub fn value(&self, id: GeoId, name: &str) -> Option<f64> {
        let pos = self.index.position(id)?;
        self.column(name)?.get(pos).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_two_columns() -> RawTable {
        RawTable::new(
            vec!["oid".into(), "note".into()],
            vec![
                ValueColumn::Int(vec![Some(1), Some(2), None]),
                ValueColumn::Str(vec![Some("a".into()), None, Some("c".into())]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_raw_table_access_and_filter() {
        let table = raw_two_columns();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.column("oid").unwrap().get_i64(1), Some(2));
        assert!(table.column("oid").unwrap().is_null(2));
        assert_eq!(table.column("note").unwrap().get_str(0), Some("a"));
        assert!(table.column("absent").is_none());

        let filtered = table.filter_rows(&[2, 0]);
        assert_eq!(filtered.num_rows(), 2);
        assert_eq!(filtered.column("note").unwrap().get_str(0), Some("c"));
        assert_eq!(filtered.column("oid").unwrap().get_i64(1), Some(1));
    }

    #[test]
    fn test_raw_table_rejects_ragged_columns() {
        let err = RawTable::new(
            vec!["a".into(), "b".into()],
            vec![
                ValueColumn::Int(vec![Some(1)]),
                ValueColumn::Int(vec![Some(1), Some(2)]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, FeatureError::Schema(_)));
    }

    #[test]
    fn test_push_raw_lenient_parsing() {
        let mut col = ValueColumn::empty(ValueType::Float);
        assert!(!col.push_raw("1.5"));
        assert!(!col.push_raw(""));
        assert!(col.push_raw("N")); // unparseable, recorded
        assert!(col.push_raw("nan")); // parses to NaN, treated as unparseable
        assert_eq!(col.get_f64(0), Some(1.5));
        assert!(col.is_null(1));
        assert!(col.is_null(2));
        assert!(col.is_null(3));
    }

    #[test]
    fn test_id_repr_from_each_type() {
        let s = ValueColumn::Str(vec![Some("261635172001001".into())]);
        assert_eq!(s.get_id_repr(0).as_deref(), Some("261635172001001"));

        let i = ValueColumn::Int(vec![Some(261_635_172_001_001)]);
        assert_eq!(i.get_id_repr(0).as_deref(), Some("261635172001001"));

        let f = ValueColumn::Float(vec![Some(261_635_172_001_001.0), Some(1.5)]);
        assert_eq!(f.get_id_repr(0).as_deref(), Some("261635172001001"));
        assert_eq!(f.get_id_repr(1), None); // fractional, not an id
    }

    #[test]
    fn test_validate_ids_rejects_mixed_widths() {
        // One block-width id and one block-group-width id in the same
        // column: a structural contract violation, not a padding case.
        let raw = vec!["261635172001001".to_string(), "261635172001".to_string()];
        let err = validate_ids(Grain::Block, &raw).unwrap_err();
        assert!(matches!(err, FeatureError::Schema(_)));

        let ok = validate_ids(
            Grain::Block,
            &["261635172001001".to_string(), "261635172001002".to_string()],
        )
        .unwrap();
        assert_eq!(ok.len(), 2);
    }

    #[test]
    fn test_cleansed_table_checks_grain_and_length() {
        let ids = vec![
            GeoId::parse("261635172001001", Grain::Block).unwrap(),
            GeoId::parse("261635172001002", Grain::Block).unwrap(),
        ];
        let table = RawTable::new(
            vec!["x".into()],
            vec![ValueColumn::Float(vec![Some(1.0), Some(2.0)])],
        )
        .unwrap();
        let cleansed = CleansedTable::new(Grain::Block, ids.clone(), table.clone()).unwrap();
        assert_eq!(cleansed.len(), 2);
        assert_eq!(cleansed.column_f64("x").unwrap()[1], Some(2.0));

        // Declared tract grain with block-grain ids.
        let err = CleansedTable::new(Grain::Tract, ids.clone(), table).unwrap_err();
        assert!(matches!(err, FeatureError::Schema(_)));

        // Row-count mismatch.
        let short = RawTable::new(vec!["x".into()], vec![ValueColumn::Float(vec![Some(1.0)])])
            .unwrap();
        let err = CleansedTable::new(Grain::Block, ids, short).unwrap_err();
        assert!(matches!(err, FeatureError::Schema(_)));
    }

    #[test]
    fn test_string_column_not_aggregatable() {
        let ids = vec![GeoId::parse("261635172001001", Grain::Block).unwrap()];
        let table = RawTable::new(
            vec!["state".into()],
            vec![ValueColumn::Str(vec![Some("MI".into())])],
        )
        .unwrap();
        let cleansed = CleansedTable::new(Grain::Block, ids, table).unwrap();
        assert!(matches!(
            cleansed.column_f64("state"),
            Err(FeatureError::Schema(_))
        ));
    }
}
