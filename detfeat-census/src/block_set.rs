//! In-scope census blocks and derivations over them.
//!
//! A [`BlockSet`] is the ground truth for one census year: every block at
//! least partially intersecting the city boundary, with the block polygon
//! and precomputed inclusion flags at each grain. Canonical identifier
//! sets at coarser grains, refinement joins, and point assignment all
//! derive from it.
//!
//! The prepared backing table is CSV with a WKT geometry column:
//!
//! ```text
//! block_id,block_x,block_in,bg_x,bg_in,tract_x,tract_in,geometry
//! 261635172001001,1,1,1,0,1,0,"POLYGON((-83.1 42.35, ...))"
//! ```
//!
//! Flag columns are 0/1: `_x` is "intersects the city boundary", `_in` is
//! "completely within", each evaluated at the named grain. WKT is kept as
//! the geometry source of truth; parsing happens once at load.

use crate::error::{CensusError, Result};
use crate::year::{Inclusion, InclusionCriteria};
use detfeat_core::{GeoId, Grain};
use geo_types::Geometry;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

/// Whether a block's surrounding geography intersects / lies within the
/// city boundary, precomputed at each grain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InclusionFlags {
    pub block_intersects: bool,
    pub block_within: bool,
    pub block_group_intersects: bool,
    pub block_group_within: bool,
    pub tract_intersects: bool,
    pub tract_within: bool,
}

impl InclusionFlags {
    /// Evaluate the flag selected by an inclusion rule.
    pub fn satisfies(&self, inclusion: Inclusion) -> bool {
        match (inclusion.grain, inclusion.criteria) {
            (Grain::Block, InclusionCriteria::Intersects) => self.block_intersects,
            (Grain::Block, InclusionCriteria::Within) => self.block_within,
            (Grain::BlockGroup, InclusionCriteria::Intersects) => self.block_group_intersects,
            (Grain::BlockGroup, InclusionCriteria::Within) => self.block_group_within,
            (Grain::Tract, InclusionCriteria::Intersects) => self.tract_intersects,
            (Grain::Tract, InclusionCriteria::Within) => self.tract_within,
        }
    }
}

/// One in-scope census block.
#[derive(Debug, Clone)]
pub struct BlockRecord {
    /// Block identifier (15 digits).
    pub id: GeoId,
    /// Inclusion flags for this block's geographies.
    pub flags: InclusionFlags,
    /// Block polygon (POLYGON or MULTIPOLYGON in the backing table).
    pub geometry: Geometry<f64>,
}

/// All in-scope blocks for one census year, sorted by identifier.
pub struct BlockSet {
    records: Vec<BlockRecord>,
}

impl BlockSet {
    /// Build from block records. Sorts by id; duplicate block ids are a
    /// format error in the prepared table.
    pub fn new(mut records: Vec<BlockRecord>) -> Result<Self> {
        records.sort_by_key(|r| r.id);
        for pair in records.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(CensusError::Format(format!(
                    "duplicate block id {} in geography table",
                    pair[0].id
                )));
            }
        }
        Ok(Self { records })
    }

    /// Read a prepared geography table from a CSV path.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CensusError::DataUnavailable(path.to_path_buf()));
        }
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Read a prepared geography table from any reader.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers = rdr.headers()?.clone();
        let col = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| CensusError::Format(format!("missing column {name:?}")))
        };
        let id_col = col("block_id")?;
        let flag_cols = [
            col("block_x")?,
            col("block_in")?,
            col("bg_x")?,
            col("bg_in")?,
            col("tract_x")?,
            col("tract_in")?,
        ];
        let geom_col = col("geometry")?;

        let mut records = Vec::new();
        for row in rdr.records() {
            let row = row?;
            let id = GeoId::parse(&row[id_col], Grain::Block)
                .map_err(|e| CensusError::Format(e.to_string()))?;

            let mut flags = [false; 6];
            for (slot, &idx) in flags.iter_mut().zip(&flag_cols) {
                *slot = match &row[idx] {
                    "0" => false,
                    "1" => true,
                    other => {
                        return Err(CensusError::Format(format!(
                            "bad inclusion flag {other:?} for block {id}"
                        )))
                    }
                };
            }
            let [block_x, block_in, bg_x, bg_in, tract_x, tract_in] = flags;

            let geometry = parse_wkt(&row[geom_col])?;
            if !matches!(geometry, Geometry::Polygon(_) | Geometry::MultiPolygon(_)) {
                return Err(CensusError::Format(format!(
                    "block {id} geometry is not a polygon"
                )));
            }

            records.push(BlockRecord {
                id,
                flags: InclusionFlags {
                    block_intersects: block_x,
                    block_within: block_in,
                    block_group_intersects: bg_x,
                    block_group_within: bg_in,
                    tract_intersects: tract_x,
                    tract_within: tract_in,
                },
                geometry,
            });
        }

        tracing::debug!(blocks = records.len(), "loaded geography table");
        Self::new(records)
    }

    /// Number of in-scope blocks.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockRecord> {
        self.records.iter()
    }

    /// The deduplicated identifier set at `grain` for blocks passing the
    /// inclusion rule. Identical inputs always yield an identical set.
    pub fn canonical_ids(&self, grain: Grain, inclusion: Inclusion) -> BTreeSet<GeoId> {
        self.records
            .iter()
            .filter(|r| r.flags.satisfies(inclusion))
            .map(|r| {
                // Block is the finest grain, so truncation is total here.
                r.id.to_grain(grain).expect("block truncates to any grain")
            })
            .collect()
    }

    /// All identifiers at `target` grain rolling up to `coarse`: the
    /// ground-truth refinement join. Ascending order, deduplicated.
    pub fn children(&self, coarse: GeoId, target: Grain) -> Result<Vec<GeoId>> {
        if !coarse.grain().is_coarser_or_equal(target) {
            // The join only runs in the refining direction.
            return Err(detfeat_core::GrainError::RefineWithoutJoin {
                from: coarse.grain(),
                to: target,
            }
            .into());
        }
        let mut out: Vec<GeoId> = Vec::new();
        for record in &self.records {
            let candidate = record.id.to_grain(target)?;
            if candidate.rolls_up_to(coarse) && out.last() != Some(&candidate) {
                out.push(candidate);
            }
        }
        Ok(out)
    }
}

/// Parse a WKT string into a geo-types geometry.
pub fn parse_wkt(wkt_str: &str) -> Result<Geometry<f64>> {
    use std::str::FromStr;
    wkt::Wkt::from_str(wkt_str)
        .map_err(|e| CensusError::WktParse(format!("{e:?}")))
        .and_then(|w| {
            w.try_into()
                .map_err(|e: wkt::conversion::Error| CensusError::WktParse(format!("{e:?}")))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(all: bool) -> InclusionFlags {
        InclusionFlags {
            block_intersects: all,
            block_within: all,
            block_group_intersects: all,
            block_group_within: all,
            tract_intersects: all,
            tract_within: all,
        }
    }

    fn square(x0: f64, y0: f64) -> Geometry<f64> {
        parse_wkt(&format!(
            "POLYGON(({x0} {y0}, {x1} {y0}, {x1} {y1}, {x0} {y1}, {x0} {y0}))",
            x1 = x0 + 1.0,
            y1 = y0 + 1.0,
        ))
        .unwrap()
    }

    fn record(id: &str, all_flags: bool) -> BlockRecord {
        BlockRecord {
            id: GeoId::parse(id, Grain::Block).unwrap(),
            flags: flags(all_flags),
            geometry: square(0.0, 0.0),
        }
    }

    #[test]
    fn test_canonical_ids_dedup_and_order() {
        let set = BlockSet::new(vec![
            record("261635172001001", true),
            record("261635172001002", true),
            record("261635172002001", true),
            record("261635401001001", true),
        ])
        .unwrap();

        let tracts = set.canonical_ids(Grain::Tract, Inclusion::default());
        let rendered: Vec<String> = tracts.iter().map(|t| t.to_string()).collect();
        assert_eq!(rendered, vec!["26163517200", "26163540100"]);

        let groups = set.canonical_ids(Grain::BlockGroup, Inclusion::default());
        assert_eq!(groups.len(), 3);

        let blocks = set.canonical_ids(Grain::Block, Inclusion::default());
        assert_eq!(blocks.len(), 4);
    }

    #[test]
    fn test_inclusion_filtering() {
        let mut edge = record("261635172002001", true);
        edge.flags.block_within = false;

        let set = BlockSet::new(vec![record("261635172001001", true), edge]).unwrap();

        let all = set.canonical_ids(
            Grain::Block,
            Inclusion::new(Grain::Block, InclusionCriteria::Intersects),
        );
        assert_eq!(all.len(), 2);

        let strictly_inside = set.canonical_ids(
            Grain::Block,
            Inclusion::new(Grain::Block, InclusionCriteria::Within),
        );
        assert_eq!(strictly_inside.len(), 1);
    }

    #[test]
    fn test_children_is_the_refinement_join() {
        let set = BlockSet::new(vec![
            record("261635172001001", true),
            record("261635172001002", true),
            record("261635172002001", true),
            record("261635401001001", true),
        ])
        .unwrap();

        let tract = GeoId::parse("26163517200", Grain::Tract).unwrap();
        let blocks = set.children(tract, Grain::Block).unwrap();
        assert_eq!(blocks.len(), 3);
        assert!(blocks.iter().all(|b| b.rolls_up_to(tract)));

        let groups = set.children(tract, Grain::BlockGroup).unwrap();
        let rendered: Vec<String> = groups.iter().map(|g| g.to_string()).collect();
        assert_eq!(rendered, vec!["261635172001", "261635172002"]);

        // Asking for children coarser than the parent is a contract error.
        let group = GeoId::parse("261635172001", Grain::BlockGroup).unwrap();
        assert!(set.children(group, Grain::Tract).is_err());
    }

    #[test]
    fn test_duplicate_block_ids_rejected() {
        let err = BlockSet::new(vec![
            record("261635172001001", true),
            record("261635172001001", true),
        ])
        .unwrap_err();
        assert!(matches!(err, CensusError::Format(_)));
    }

    #[test]
    fn test_csv_round_trip() {
        let csv_text = "\
block_id,block_x,block_in,bg_x,bg_in,tract_x,tract_in,geometry
261635172001001,1,1,1,1,1,1,\"POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))\"
261635172001002,1,0,1,0,1,0,\"POLYGON((1 0, 2 0, 2 1, 1 1, 1 0))\"
";
        let set = BlockSet::from_csv_reader(csv_text.as_bytes()).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.canonical_ids(
                Grain::Block,
                Inclusion::new(Grain::Block, InclusionCriteria::Within)
            )
            .len(),
            1
        );
    }

    #[test]
    fn test_csv_rejects_bad_flag() {
        let csv_text = "\
block_id,block_x,block_in,bg_x,bg_in,tract_x,tract_in,geometry
261635172001001,1,yes,1,1,1,1,\"POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))\"
";
        assert!(matches!(
            BlockSet::from_csv_reader(csv_text.as_bytes()),
            Err(CensusError::Format(_))
        ));
    }
}
