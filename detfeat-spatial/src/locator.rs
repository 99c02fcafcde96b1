//! Block locator and batch point assignment.

use crate::bbox::BBox;
use crate::error::{Result, SpatialError};
use detfeat_census::{CensusYear, GeographyProvider};
use detfeat_core::{GeoId, InputError};
use geo::Intersects;
use geo_types::{Geometry, Point};
use rustc_hash::{FxHashMap, FxHashSet};

/// One point-located observation awaiting assignment.
///
/// `oid` is the source dataset's unique record id; assignment results are
/// keyed by it, so it must be unique within one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRecord {
    pub oid: i64,
    pub lat: f64,
    pub lon: f64,
}

impl PointRecord {
    pub fn new(oid: i64, lat: f64, lon: f64) -> Self {
        Self { oid, lat, lon }
    }
}

struct Cell {
    id: GeoId,
    bbox: BBox,
    geometry: Geometry<f64>,
}

/// Assigns points to the census block containing them.
///
/// Snapshots the year's block polygons in ascending identifier order with
/// precomputed bounding boxes. Build once per (year, batch of sources);
/// the snapshot borrows nothing from the provider.
pub struct BlockLocator {
    year: CensusYear,
    cells: Vec<Cell>,
}

impl BlockLocator {
    /// Snapshot block polygons for a census year.
    pub fn new(provider: &dyn GeographyProvider, year: CensusYear) -> Result<Self> {
        let blocks = provider.blocks(year)?;
        // BlockSet iterates in ascending id order; keep it, the scan
        // order below is the tie-break.
        let cells = blocks
            .iter()
            .filter_map(|record| {
                BBox::from_geometry(&record.geometry).map(|bbox| Cell {
                    id: record.id,
                    bbox,
                    geometry: record.geometry.clone(),
                })
            })
            .collect();
        Ok(Self { year, cells })
    }

    pub fn year(&self) -> CensusYear {
        self.year
    }

    /// Number of block polygons in the snapshot.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The block containing a point, or `None` when the point falls
    /// outside every in-scope block.
    ///
    /// A point on a shared edge intersects more than one polygon; the
    /// lowest block id wins (first match in the ascending-id scan).
    pub fn locate(&self, lat: f64, lon: f64) -> Option<GeoId> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        let point = Point::new(lon, lat);
        self.cells
            .iter()
            .find(|cell| cell.bbox.contains_point(lat, lon) && cell.geometry.intersects(&point))
            .map(|cell| cell.id)
    }

    /// Assign every point to its enclosing block.
    ///
    /// Returns one entry per input point: `Some(block)` or `None` for
    /// points outside every block. Duplicate oids violate the input
    /// contract and fail before any assignment.
    pub fn assign(&self, points: &[PointRecord]) -> Result<FxHashMap<i64, Option<GeoId>>> {
        let mut seen = FxHashSet::default();
        for point in points {
            if !seen.insert(point.oid) {
                return Err(SpatialError::Input(InputError::DuplicatePointId(point.oid)));
            }
        }

        let _span = tracing::debug_span!("assign_points", year = %self.year, n = points.len())
            .entered();

        let mut out = FxHashMap::default();
        let mut unmatched = 0usize;
        for point in points {
            let id = self.locate(point.lat, point.lon);
            if id.is_none() {
                unmatched += 1;
            }
            out.insert(point.oid, id);
        }

        if unmatched > 0 {
            tracing::warn!(
                unmatched,
                total = points.len(),
                "points outside every in-scope block"
            );
        }
        Ok(out)
    }
}
