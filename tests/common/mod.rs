// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Common test utilities shared across integration tests.

use std::sync::Arc;

use bitfield_search::catalog::BitfieldFilter;
use bitfield_search::machine::{FilterRegion, SimulatedRouter};
use bitfield_search::search::StepStatus;
use bitfield_search::worker::CompressionWorker;
use bitfield_search::{
    CompressedResult, FatalError, KeyMask, Route, RouteEntry, RoutingTable, SearchConfig,
    SearchCoordinator, WorkerConfig,
};

/// A base table with one entry per source core: the core's address block,
/// routed on a per-core link.
pub fn block_base_table(n_cores: u32) -> RoutingTable {
    RoutingTable::from_entries(
        (0..n_cores)
            .map(|core| {
                RouteEntry::new(
                    KeyMask::new(core << 8, 0xFF00),
                    Route::new(core + 1),
                    None,
                )
            })
            .collect(),
    )
}

/// Per-core regions of single-address filters inside the core's block.
///
/// Redundancy descends with the filter's global index, so the catalog order
/// (and therefore which filters a midpoint folds) is exactly predictable:
/// global rank `core * filters_per_core + i`.
pub fn block_regions(n_cores: u32, filters_per_core: u32) -> Vec<FilterRegion> {
    let total = n_cores * filters_per_core;
    (0..n_cores)
        .map(|core| {
            let filters = (0..filters_per_core)
                .map(|i| {
                    BitfieldFilter::new(
                        KeyMask::new((core << 8) | i, 0xFFFF),
                        core,
                        total - (core * filters_per_core + i),
                    )
                })
                .collect();
            FilterRegion::new(core, filters)
        })
        .collect()
}

/// Single-threaded harness: one coordinator and its workers, advanced by
/// alternating coordinator steps and worker polls so every test run is
/// deterministic.
#[derive(Debug)]
pub struct Sim {
    coordinator: SearchCoordinator,
    workers: Vec<CompressionWorker>,
}

impl Sim {
    pub fn new(
        base: RoutingTable,
        regions: Vec<FilterRegion>,
        config: SearchConfig,
        n_workers: usize,
        worker_config: WorkerConfig,
    ) -> Result<Self, FatalError> {
        let coordinator = SearchCoordinator::new(base, regions, config)?;
        let comms = coordinator.comms();
        let workers = (0..n_workers)
            .map(|_| {
                let slot = comms.register_worker().expect("a free worker slot");
                CompressionWorker::new(Arc::clone(&slot), worker_config)
            })
            .collect();
        Ok(Self {
            coordinator,
            workers,
        })
    }

    /// Run the search to completion and finalize against `router`.
    pub fn run(mut self, router: &mut SimulatedRouter) -> Result<CompressedResult, FatalError> {
        for _ in 0..10_000 {
            match self.coordinator.step() {
                Err(err) => return Err(err),
                Ok(StepStatus::Finished) => return self.coordinator.finalize(router),
                Ok(_) => {}
            }
            for worker in &mut self.workers {
                worker.poll();
            }
        }
        panic!("search did not finish");
    }
}

/// The highest midpoint whose candidate table minimises under `capacity`,
/// computed by brute force for comparison against the searched answer.
///
/// Assumes feasibility is monotone over the fixture (true for the block
/// fixtures here, where folding more filters only splits entries further).
pub fn brute_force_best_midpoint(
    base: &RoutingTable,
    regions: &[FilterRegion],
    capacity: usize,
) -> Option<usize> {
    use bitfield_search::arena::ArenaPool;
    use bitfield_search::catalog::{build_candidate_table, SortedBitfieldCatalog};
    use bitfield_search::minimize::{minimise, NeverCancel};

    let catalog = SortedBitfieldCatalog::from_regions(regions, base).unwrap();
    let mut best = None;
    for midpoint in 0..=catalog.len() {
        let arena = ArenaPool::new(1 << 20).carve(1 << 20).unwrap();
        let mut candidate = build_candidate_table(base, &catalog, midpoint, &arena).unwrap();
        if minimise(candidate.table_mut(), capacity, &arena, &NeverCancel).is_ok() {
            best = Some(midpoint);
        }
    }
    best
}
