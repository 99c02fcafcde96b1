//! Geography provider trait and directory-backed implementation.
//!
//! The provider is the seam between identifier derivations and the
//! prepared backing files: tests supply synthetic block sets, production
//! reads the per-year tables from a data directory. Loaded block sets are
//! cached behind interior mutability so a shared provider can serve many
//! feature sources without re-reading.

use crate::block_set::BlockSet;
use crate::error::Result;
use crate::year::CensusYear;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Source of in-scope census blocks per year.
pub trait GeographyProvider: Send + Sync {
    /// The block set for a census year. Repeated calls return the same
    /// set; implementations cache.
    fn blocks(&self, year: CensusYear) -> Result<Arc<BlockSet>>;
}

/// Provider reading prepared geography tables from a data directory.
///
/// Expects the layout the preparation step produces:
///
/// ```text
/// <dir>/detroit_census_blocks_2010/geos_in_detroit_2010.csv
/// <dir>/detroit_census_blocks_2020/geos_in_detroit_2020.csv
/// ```
pub struct DirProvider {
    dir: PathBuf,
    cache: RwLock<FxHashMap<CensusYear, Arc<BlockSet>>>,
}

impl DirProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// Path of the prepared table for a year.
    pub fn path_for(&self, year: CensusYear) -> PathBuf {
        self.dir
            .join(format!("detroit_census_blocks_{year}"))
            .join(format!("geos_in_detroit_{year}.csv"))
    }

    /// The data directory this provider reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl GeographyProvider for DirProvider {
    fn blocks(&self, year: CensusYear) -> Result<Arc<BlockSet>> {
        if let Some(cached) = self.cache.read().expect("cache lock").get(&year) {
            return Ok(Arc::clone(cached));
        }

        let path = self.path_for(year);
        let _span = tracing::debug_span!("load_geographies", %year).entered();
        let set = Arc::new(BlockSet::from_csv_path(&path)?);
        tracing::info!(%year, blocks = set.len(), "loaded census geographies");

        let mut cache = self.cache.write().expect("cache lock");
        Ok(Arc::clone(cache.entry(year).or_insert(set)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CensusError;

    #[test]
    fn test_missing_file_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let provider = DirProvider::new(dir.path());
        let err = provider.blocks(CensusYear::Y2020).unwrap_err();
        assert!(matches!(err, CensusError::DataUnavailable(_)));
    }

    #[test]
    fn test_cache_returns_same_set() {
        let dir = tempfile::tempdir().unwrap();
        let year_dir = dir.path().join("detroit_census_blocks_2020");
        std::fs::create_dir_all(&year_dir).unwrap();
        std::fs::write(
            year_dir.join("geos_in_detroit_2020.csv"),
            "block_id,block_x,block_in,bg_x,bg_in,tract_x,tract_in,geometry\n\
             261635172001001,1,1,1,1,1,1,\"POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))\"\n",
        )
        .unwrap();

        let provider = DirProvider::new(dir.path());
        let a = provider.blocks(CensusYear::Y2020).unwrap();
        let b = provider.blocks(CensusYear::Y2020).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
