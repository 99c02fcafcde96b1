//! The canonical identifier index.
//!
//! Every feature output is reindexed against the canonical set of
//! identifiers for its (census year, grain) pair, so per-source tables
//! share an identical index and missing data becomes an explicit null
//! rather than an absent row.
//!
//! Cardinalities of the real prepared tables, for reference:
//!
//! | year | block | block group | tract |
//! |---|---|---|---|
//! | 2010 | 16341 | 970 | 346 |
//! | 2020 | 14691 | 698 | 324 |

use crate::error::Result;
use crate::provider::GeographyProvider;
use crate::year::{CensusYear, Inclusion};
use detfeat_core::{GeoId, Grain};

/// Ordered, deduplicated identifier universe for one (year, grain,
/// inclusion) triple. Ascending id order; stable across rebuilds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalIndex {
    year: CensusYear,
    grain: Grain,
    inclusion: Inclusion,
    ids: Vec<GeoId>,
}

impl CanonicalIndex {
    /// Derive the index from a provider's block set.
    pub fn build(
        provider: &dyn GeographyProvider,
        year: CensusYear,
        grain: Grain,
        inclusion: Inclusion,
    ) -> Result<Self> {
        let blocks = provider.blocks(year)?;
        let ids: Vec<GeoId> = blocks.canonical_ids(grain, inclusion).into_iter().collect();
        tracing::debug!(%year, %grain, len = ids.len(), "built canonical index");
        Ok(Self {
            year,
            grain,
            inclusion,
            ids,
        })
    }

    /// Assemble from a precomputed identifier set (sorted, deduplicated).
    ///
    /// For callers that already hold the canonical ids, e.g. a cached
    /// index round-tripped through storage or a test fixture.
    pub fn from_ids(
        year: CensusYear,
        grain: Grain,
        inclusion: Inclusion,
        mut ids: Vec<GeoId>,
    ) -> Self {
        ids.sort();
        ids.dedup();
        Self {
            year,
            grain,
            inclusion,
            ids,
        }
    }

    pub fn year(&self) -> CensusYear {
        self.year
    }

    pub fn grain(&self) -> Grain {
        self.grain
    }

    pub fn inclusion(&self) -> Inclusion {
        self.inclusion
    }

    /// Number of canonical identifiers.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifiers in ascending order.
    pub fn ids(&self) -> &[GeoId] {
        &self.ids
    }

    /// Position of an identifier in the index, if canonical.
    pub fn position(&self, id: GeoId) -> Option<usize> {
        self.ids.binary_search(&id).ok()
    }

    pub fn contains(&self, id: GeoId) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = GeoId> + '_ {
        self.ids.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_set::{BlockRecord, BlockSet, InclusionFlags};
    use crate::year::InclusionCriteria;
    use std::sync::Arc;

    struct FixedProvider(Arc<BlockSet>);

    impl GeographyProvider for FixedProvider {
        fn blocks(&self, _year: CensusYear) -> Result<Arc<BlockSet>> {
            Ok(Arc::clone(&self.0))
        }
    }

    fn fixture() -> FixedProvider {
        let square = crate::block_set::parse_wkt("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
        let all = InclusionFlags {
            block_intersects: true,
            block_within: true,
            block_group_intersects: true,
            block_group_within: true,
            tract_intersects: true,
            tract_within: true,
        };
        let ids = [
            "261635172001001",
            "261635172001002",
            "261635172002001",
            "261635401001001",
            "261635401001002",
        ];
        let records = ids
            .iter()
            .map(|id| BlockRecord {
                id: GeoId::parse(id, Grain::Block).unwrap(),
                flags: all,
                geometry: square.clone(),
            })
            .collect();
        FixedProvider(Arc::new(BlockSet::new(records).unwrap()))
    }

    #[test]
    fn test_cardinality_per_grain() {
        let provider = fixture();
        let inclusion = Inclusion::new(Grain::Block, InclusionCriteria::Intersects);

        let blocks =
            CanonicalIndex::build(&provider, CensusYear::Y2020, Grain::Block, inclusion).unwrap();
        let groups =
            CanonicalIndex::build(&provider, CensusYear::Y2020, Grain::BlockGroup, inclusion)
                .unwrap();
        let tracts =
            CanonicalIndex::build(&provider, CensusYear::Y2020, Grain::Tract, inclusion).unwrap();

        assert_eq!(blocks.len(), 5);
        assert_eq!(groups.len(), 3);
        assert_eq!(tracts.len(), 2);
    }

    #[test]
    fn test_stable_across_rebuilds() {
        let provider = fixture();
        let inclusion = Inclusion::default();
        let a =
            CanonicalIndex::build(&provider, CensusYear::Y2020, Grain::Tract, inclusion).unwrap();
        let b =
            CanonicalIndex::build(&provider, CensusYear::Y2020, Grain::Tract, inclusion).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_position_lookup() {
        let provider = fixture();
        let index = CanonicalIndex::build(
            &provider,
            CensusYear::Y2020,
            Grain::Tract,
            Inclusion::default(),
        )
        .unwrap();

        let tract = GeoId::parse("26163517200", Grain::Tract).unwrap();
        assert_eq!(index.position(tract), Some(0));
        assert!(index.contains(tract));

        let absent = GeoId::parse("26163999900", Grain::Tract).unwrap();
        assert_eq!(index.position(absent), None);
    }
}
