// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! External collaborators of the search: the region store's view of per-core
//! filter regions, and the hardware router install primitive.
//!
//! Reading the raw on-device region format (headers, checksums) is out of
//! scope; [`FilterRegion`] is the already-decoded view this engine consumes,
//! and the one it annotates with results for host-side auditing.

use crate::constants::ROUTER_CAPACITY;
use crate::catalog::BitfieldFilter;
use crate::table::RouteEntry;

use thiserror::Error;

/// Failure to install a table into the hardware router.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InstallError {
    /// The router could not allocate room for the table. All-or-nothing: no
    /// entries were written.
    #[error("router has no room for {requested} entries (capacity {capacity})")]
    NoRoom { requested: usize, capacity: usize },
}

/// Hardware router install primitive: all-or-nothing, owner-tagged.
pub trait Router {
    fn install(&mut self, entries: &[RouteEntry], owner: u32) -> Result<(), InstallError>;
}

/// A table accepted by the [`SimulatedRouter`].
#[derive(Debug, Clone)]
pub struct InstalledTable {
    pub owner: u32,
    pub entries: Vec<RouteEntry>,
}

/// In-process router model, for the demo binary and tests.
#[derive(Debug)]
pub struct SimulatedRouter {
    capacity: usize,
    installed: Option<InstalledTable>,
}

impl SimulatedRouter {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            installed: None,
        }
    }

    pub fn installed(&self) -> Option<&InstalledTable> {
        self.installed.as_ref()
    }
}

impl Default for SimulatedRouter {
    fn default() -> Self {
        Self::new(ROUTER_CAPACITY)
    }
}

impl Router for SimulatedRouter {
    fn install(&mut self, entries: &[RouteEntry], owner: u32) -> Result<(), InstallError> {
        if entries.len() > self.capacity {
            return Err(InstallError::NoRoom {
                requested: entries.len(),
                capacity: self.capacity,
            });
        }
        self.installed = Some(InstalledTable {
            owner,
            entries: entries.to_vec(),
        });
        Ok(())
    }
}

/// One source core's filter region, as decoded by the region store.
///
/// `n_merged_filters` starts at zero and is written back when the search
/// finalises, so the host can audit per-core merge coverage without re-running
/// the search.
#[derive(Debug, Clone)]
pub struct FilterRegion {
    /// The source core this region belongs to.
    pub core: u32,
    /// The core's filters, in region order (unsorted).
    pub filters: Vec<BitfieldFilter>,
    /// How many of this core's filters were folded into the winning table.
    pub n_merged_filters: u32,
}

impl FilterRegion {
    pub fn new(core: u32, filters: Vec<BitfieldFilter>) -> Self {
        Self {
            core,
            filters,
            n_merged_filters: 0,
        }
    }
}

/// Summary of a finished search, published for external audit.
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// Winning midpoint: how many highest-priority filters were folded in.
    pub midpoint: usize,
    /// Entry count of the installed table.
    pub table_entries: usize,
    /// Per source core, how many of its filters the winning midpoint covers.
    pub merged_by_core: Vec<(u32, u32)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{KeyMask, Route};

    fn entry(key: u32) -> RouteEntry {
        RouteEntry::new(KeyMask::new(key, 0xFF), Route::new(1), None)
    }

    #[test]
    fn install_is_all_or_nothing() {
        let mut router = SimulatedRouter::new(2);
        let too_big: Vec<RouteEntry> = (0..3).map(entry).collect();
        assert_eq!(
            router.install(&too_big, 7),
            Err(InstallError::NoRoom {
                requested: 3,
                capacity: 2
            })
        );
        assert!(router.installed().is_none());

        let fits: Vec<RouteEntry> = (0..2).map(entry).collect();
        router.install(&fits, 7).unwrap();
        let installed = router.installed().unwrap();
        assert_eq!(installed.owner, 7);
        assert_eq!(installed.entries.len(), 2);
    }
}
