//! Chunk-streamed CSV ingestion.
//!
//! A source declares the column subset it needs and a primitive type per
//! column; everything else in the file is ignored. Rows are filtered and
//! parsed record by record, so a whitelist filter over a large file
//! (call-for-service records run to millions of rows) never materializes
//! the rejected rows. Cells that fail to parse at the declared type
//! become nulls and are counted as a data-quality diagnostic, not an
//! error.

use crate::error::{FeatureError, Result};
use crate::table::{RawTable, ValueColumn, ValueType};
use std::path::Path;

/// One declared column of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: ValueType,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, ty: ValueType) -> Self {
        Self { name, ty }
    }
}

/// A not-yet-parsed CSV row, visible to row filters.
pub struct RawRow<'a> {
    columns: &'a [(String, usize)],
    record: &'a csv::StringRecord,
}

impl RawRow<'_> {
    /// Cell under a declared column name, trimmed; empty cells are
    /// `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        let &(_, idx) = self.columns.iter().find(|(n, _)| n == name)?;
        let cell = self.record.get(idx)?.trim();
        (!cell.is_empty()).then_some(cell)
    }
}

/// Keep-row predicate applied before any cell is parsed.
pub type RowFilter = fn(&RawRow<'_>) -> bool;

/// Stream a CSV file into a [`RawTable`] holding only the declared
/// columns and the rows passing the filter.
///
/// `skip_data_rows` drops rows immediately after the header (census
/// product files carry a descriptive second header row).
pub fn load_csv(
    path: &Path,
    columns: &[ColumnSpec],
    filter: Option<RowFilter>,
    skip_data_rows: usize,
) -> Result<RawTable> {
    if !path.exists() {
        return Err(FeatureError::DataUnavailable(path.to_path_buf()));
    }

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = rdr.headers()?.clone();
    let mut resolved: Vec<(String, usize)> = Vec::with_capacity(columns.len());
    for spec in columns {
        let idx = headers
            .iter()
            .position(|h| h == spec.name)
            .ok_or_else(|| {
                FeatureError::Schema(format!(
                    "source file {path:?} has no column {:?}",
                    spec.name
                ))
            })?;
        resolved.push((spec.name.to_string(), idx));
    }

    let mut builders: Vec<ValueColumn> =
        columns.iter().map(|c| ValueColumn::empty(c.ty)).collect();
    let mut rows_read = 0usize;
    let mut rows_kept = 0usize;
    let mut unparsed_cells = 0usize;

    for record in rdr.records() {
        let record = record?;
        rows_read += 1;
        if rows_read <= skip_data_rows {
            continue;
        }

        if let Some(keep) = filter {
            let row = RawRow {
                columns: &resolved,
                record: &record,
            };
            if !keep(&row) {
                continue;
            }
        }

        for (builder, (_, idx)) in builders.iter_mut().zip(&resolved) {
            let cell = record.get(*idx).unwrap_or("");
            if builder.push_raw(cell) {
                unparsed_cells += 1;
            }
        }
        rows_kept += 1;
    }

    if unparsed_cells > 0 {
        tracing::warn!(
            unparsed_cells,
            path = %path.display(),
            "cells failed to parse at their declared type; loaded as null"
        );
    }
    tracing::info!(rows_read, rows_kept, path = %path.display(), "loaded source file");

    RawTable::new(
        columns.iter().map(|c| c.name.to_string()).collect(),
        builders,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.csv");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    const COLS: [ColumnSpec; 3] = [
        ColumnSpec::new("oid", ValueType::Int),
        ColumnSpec::new("kind", ValueType::Str),
        ColumnSpec::new("value", ValueType::Float),
    ];

    #[test]
    fn test_loads_declared_subset() {
        let (_dir, path) = write_csv(
            "oid,ignored,kind,value\n\
             1,x,ASSAULT,1.5\n\
             2,y,PARKING,2.5\n",
        );
        let table = load_csv(&path, &COLS, None, 0).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert!(table.column("ignored").is_none());
        assert_eq!(table.column("value").unwrap().get_f64(1), Some(2.5));
    }

    #[test]
    fn test_row_filter_applies_before_parse() {
        fn assault_only(row: &RawRow<'_>) -> bool {
            row.get("kind").map_or(false, |k| k.contains("ASSAULT"))
        }
        let (_dir, path) = write_csv(
            "oid,kind,value\n\
             1,ASSAULT,1.0\n\
             2,PARKING,2.0\n\
             3,FELONIOUS ASSAULT,3.0\n",
        );
        let table = load_csv(&path, &COLS, Some(assault_only), 0).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column("oid").unwrap().get_i64(1), Some(3));
    }

    #[test]
    fn test_unparseable_cells_become_null() {
        let (_dir, path) = write_csv(
            "oid,kind,value\n\
             1,A,not-a-number\n\
             2,B,\n",
        );
        let table = load_csv(&path, &COLS, None, 0).unwrap();
        assert!(table.column("value").unwrap().is_null(0));
        assert!(table.column("value").unwrap().is_null(1));
    }

    #[test]
    fn test_skip_data_rows() {
        let (_dir, path) = write_csv(
            "oid,kind,value\n\
             Id,Kind of record,Estimate\n\
             1,A,1.0\n",
        );
        let table = load_csv(&path, &COLS, None, 1).unwrap();
        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.column("oid").unwrap().get_i64(0), Some(1));
    }

    #[test]
    fn test_missing_file_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_csv(&dir.path().join("absent.csv"), &COLS, None, 0).unwrap_err();
        assert!(matches!(err, FeatureError::DataUnavailable(_)));
    }

    #[test]
    fn test_missing_declared_column_is_schema_error() {
        let (_dir, path) = write_csv("oid,value\n1,2.0\n");
        let err = load_csv(&path, &COLS, None, 0).unwrap_err();
        assert!(matches!(err, FeatureError::Schema(_)));
    }
}
