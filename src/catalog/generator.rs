// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Candidate-table construction for one compression attempt.
//!
//! For a requested midpoint K, only the first K catalog filters (by descending
//! priority) are considered. Each folds exactly once, into a private narrowed
//! copy of the first base entry it intersects; base entries no active filter
//! touches are copied through untouched. Memory for the candidate is claimed
//! from the assigned worker's private sub-arena, so a failure here is a
//! retryable malloc failure, never a verdict on the midpoint itself.

use std::sync::Arc;

use crate::arena::{AllocError, ArenaClaim, SubArena};
use crate::catalog::SortedBitfieldCatalog;
use crate::table::{RouteEntry, RoutingTable};

use tracing::debug;

/// A candidate routing table plus the arena claim backing it.
///
/// The claim travels with the table: whoever drops the candidate (worker on
/// force-stop, coordinator on discard or on replacing a best result) releases
/// the worker's arena budget.
#[derive(Debug)]
pub struct CandidateTable {
    table: RoutingTable,
    _claim: ArenaClaim,
}

impl CandidateTable {
    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut RoutingTable {
        &mut self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Build the candidate table for `midpoint` against `base`, claiming its
/// memory from `arena`.
pub fn build_candidate_table(
    base: &RoutingTable,
    catalog: &SortedBitfieldCatalog,
    midpoint: usize,
    arena: &Arc<SubArena>,
) -> Result<CandidateTable, AllocError> {
    // Worst case: every active filter adds one narrowed copy and no base
    // entry is dropped for it.
    let claim = arena.claim(base.len() + midpoint)?;

    let active = catalog.prefix(midpoint);
    let mut folded = vec![false; midpoint];
    let mut table = RoutingTable::with_capacity(base.len() + midpoint);

    for entry in base.iter() {
        let mut narrowed_any = false;
        for (rank, filter) in active.iter().enumerate() {
            if folded[rank] {
                continue;
            }
            if let Some(narrowed) = entry.key_mask.intersect(filter.key_mask) {
                table.push(RouteEntry::new(narrowed, entry.route, Some(filter.source)));
                folded[rank] = true;
                narrowed_any = true;
            }
        }
        if !narrowed_any {
            table.push(*entry);
        }
    }

    debug!(
        midpoint,
        base_entries = base.len(),
        candidate_entries = table.len(),
        "built candidate table"
    );
    Ok(CandidateTable {
        table,
        _claim: claim,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaPool;
    use crate::catalog::BitfieldFilter;
    use crate::machine::FilterRegion;
    use crate::table::{KeyMask, Route};

    fn base_table() -> RoutingTable {
        RoutingTable::from_entries(vec![
            RouteEntry::new(KeyMask::new(0x00, 0xF0), Route::new(1), None),
            RouteEntry::new(KeyMask::new(0x10, 0xF0), Route::new(2), None),
            RouteEntry::new(KeyMask::new(0x20, 0xF0), Route::new(3), None),
        ])
    }

    fn catalog(filters: Vec<BitfieldFilter>) -> SortedBitfieldCatalog {
        let regions = vec![FilterRegion::new(5, filters)];
        SortedBitfieldCatalog::from_regions(&regions, &base_table()).unwrap()
    }

    fn arena(entries: usize) -> Arc<SubArena> {
        ArenaPool::new(entries).carve(entries).unwrap()
    }

    #[test]
    fn midpoint_zero_copies_the_base_table() {
        let catalog = catalog(vec![BitfieldFilter::new(KeyMask::new(0x04, 0xFF), 5, 9)]);
        let candidate = build_candidate_table(&base_table(), &catalog, 0, &arena(64)).unwrap();
        assert_eq!(candidate.table().entries(), base_table().entries());
    }

    #[test]
    fn active_filter_replaces_its_base_entry_with_a_narrowed_copy() {
        let catalog = catalog(vec![BitfieldFilter::new(KeyMask::new(0x04, 0xFF), 5, 9)]);
        let candidate = build_candidate_table(&base_table(), &catalog, 1, &arena(64)).unwrap();
        let entries = candidate.table().entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0],
            RouteEntry::new(KeyMask::new(0x04, 0xFF), Route::new(1), Some(5))
        );
        // Untouched base entries are copied through unchanged.
        assert_eq!(entries[1], base_table().entry(1));
        assert_eq!(entries[2], base_table().entry(2));
    }

    #[test]
    fn two_filters_on_one_entry_each_get_a_private_copy() {
        let catalog = catalog(vec![
            BitfieldFilter::new(KeyMask::new(0x04, 0xFF), 5, 9),
            BitfieldFilter::new(KeyMask::new(0x05, 0xFF), 5, 8),
        ]);
        let candidate = build_candidate_table(&base_table(), &catalog, 2, &arena(64)).unwrap();
        let entries = candidate.table().entries();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].key_mask, KeyMask::new(0x04, 0xFF));
        assert_eq!(entries[1].key_mask, KeyMask::new(0x05, 0xFF));
        assert_eq!(entries[0].route, Route::new(1));
        assert_eq!(entries[1].route, Route::new(1));
    }

    #[test]
    fn smaller_midpoint_drops_lowest_priority_filters_first() {
        let catalog = catalog(vec![
            BitfieldFilter::new(KeyMask::new(0x04, 0xFF), 5, 3),
            BitfieldFilter::new(KeyMask::new(0x14, 0xFF), 5, 9),
        ]);
        // Midpoint 1 keeps only the redundancy-9 filter (on the 0x10 entry).
        let candidate = build_candidate_table(&base_table(), &catalog, 1, &arena(64)).unwrap();
        let entries = candidate.table().entries();
        assert_eq!(entries[0], base_table().entry(0));
        assert_eq!(entries[1].key_mask, KeyMask::new(0x14, 0xFF));
    }

    #[test]
    fn construction_fails_when_the_arena_cannot_hold_the_worst_case() {
        let catalog = catalog(vec![BitfieldFilter::new(KeyMask::new(0x04, 0xFF), 5, 9)]);
        let small = arena(2);
        let err = build_candidate_table(&base_table(), &catalog, 1, &small).unwrap_err();
        assert!(matches!(err, AllocError::Exhausted { requested: 4, .. }));
    }

    #[test]
    fn dropping_the_candidate_releases_the_arena() {
        let catalog = catalog(vec![BitfieldFilter::new(KeyMask::new(0x04, 0xFF), 5, 9)]);
        let arena = arena(8);
        let candidate = build_candidate_table(&base_table(), &catalog, 1, &arena).unwrap();
        assert_eq!(arena.available(), 4);
        drop(candidate);
        assert_eq!(arena.available(), 8);
    }
}
