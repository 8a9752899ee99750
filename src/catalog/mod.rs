// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The bitfield catalog: every candidate filter, sorted once by priority.
//!
//! The catalog is built before the search starts and is read-only for its
//! whole lifetime. Filters are ordered descending by redundancy, so a midpoint
//! K always folds the K most valuable filters, and shrinking K drops the least
//! valuable filters first.

pub mod filter;
pub mod generator;

pub use filter::BitfieldFilter;
pub use generator::{build_candidate_table, CandidateTable};

use crate::machine::FilterRegion;
use crate::table::{KeyMask, RoutingTable};

use thiserror::Error;
use tracing::info;

/// Failure to build the catalog. Catalog construction happens once before the
/// search; any failure here is fatal to the whole process.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CatalogError {
    /// A region carries a filter that narrows no entry of the base table;
    /// folding it could never produce a valid candidate.
    #[error("core {core} has filter {key_mask} narrowing no routing entry")]
    UnroutedFilter { core: u32, key_mask: KeyMask },
}

/// Immutable, pre-sorted collection of candidate filters.
#[derive(Debug, Clone)]
pub struct SortedBitfieldCatalog {
    filters: Vec<BitfieldFilter>,
}

impl SortedBitfieldCatalog {
    /// Build the catalog from the per-core filter regions, validating every
    /// filter against the uncompressed base table.
    ///
    /// The sort is stable and descending by redundancy, so filters of equal
    /// value keep region order (lower core first).
    pub fn from_regions(
        regions: &[FilterRegion],
        base_table: &RoutingTable,
    ) -> Result<Self, CatalogError> {
        let mut filters = Vec::with_capacity(regions.iter().map(|r| r.filters.len()).sum());
        for region in regions {
            for filter in &region.filters {
                if !base_table
                    .iter()
                    .any(|e| e.key_mask.intersects(filter.key_mask))
                {
                    return Err(CatalogError::UnroutedFilter {
                        core: region.core,
                        key_mask: filter.key_mask,
                    });
                }
                // The region owns its filters; the source tag is the region's.
                filters.push(BitfieldFilter::new(
                    filter.key_mask,
                    region.core,
                    filter.redundancy,
                ));
            }
        }
        filters.sort_by(|a, b| b.redundancy.cmp(&a.redundancy));
        info!(
            n_filters = filters.len(),
            n_regions = regions.len(),
            "built sorted bitfield catalog"
        );
        Ok(Self { filters })
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn filters(&self) -> &[BitfieldFilter] {
        &self.filters
    }

    /// The `midpoint` highest-priority filters.
    pub fn prefix(&self, midpoint: usize) -> &[BitfieldFilter] {
        &self.filters[..midpoint]
    }

    /// How many of `core`'s filters fall inside the first `midpoint` ranks.
    pub fn merged_for_core(&self, core: u32, midpoint: usize) -> u32 {
        self.prefix(midpoint)
            .iter()
            .filter(|f| f.source == core)
            .count() as u32
    }
}
