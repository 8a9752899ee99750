// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Demo front end: run the compression search on a synthetic machine.
//!
//! Builds a base routing table and per-core filter regions of configurable
//! size, spawns a threaded workforce, and reports the winning midpoint.
//! Logging is controlled through `RUST_LOG` (for example
//! `RUST_LOG=bitfield_search=debug`).

use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use tracing::{error, info};

use bitfield_search::catalog::BitfieldFilter;
use bitfield_search::machine::{FilterRegion, SimulatedRouter};
use bitfield_search::worker::CompressionWorker;
use bitfield_search::{
    KeyMask, Route, RouteEntry, RoutingTable, SearchConfig, SearchCoordinator, WorkerConfig,
};

const N_SOURCE_CORES: u32 = 8;
const FILTERS_PER_CORE: u32 = 16;
const N_WORKERS: usize = 4;
const ROUTER_CAPACITY: usize = 1023;
const WORKER_ARENA_ENTRIES: usize = 8192;
const APP_ID: u32 = 17;

/// One base entry per source core, keyed on the core's address block.
fn synthetic_base_table() -> RoutingTable {
    RoutingTable::from_entries(
        (0..N_SOURCE_CORES)
            .map(|core| {
                RouteEntry::new(
                    KeyMask::new(core << 8, 0xFF00),
                    Route::new(1 << (core % 6)),
                    None,
                )
            })
            .collect(),
    )
}

/// Per-core filters narrowing the core's block to single addresses, with a
/// spread of redundancy ranks so the catalog order is interesting.
fn synthetic_regions() -> Vec<FilterRegion> {
    (0..N_SOURCE_CORES)
        .map(|core| {
            let filters = (0..FILTERS_PER_CORE)
                .map(|i| {
                    BitfieldFilter::new(
                        KeyMask::new((core << 8) | i, 0xFFFF),
                        core,
                        (i * 7 + core) % 64,
                    )
                })
                .collect();
            FilterRegion::new(core, filters)
        })
        .collect()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let coordinator = match SearchCoordinator::new(
        synthetic_base_table(),
        synthetic_regions(),
        SearchConfig {
            capacity: ROUTER_CAPACITY,
            worker_arena_entries: WORKER_ARENA_ENTRIES,
            app_id: APP_ID,
        },
    ) {
        Ok(coordinator) => coordinator,
        Err(err) => {
            error!(%err, "could not set up the search");
            return ExitCode::from(err.exit_code() as u8);
        }
    };

    let comms = coordinator.comms();
    let worker_config = WorkerConfig {
        capacity: ROUTER_CAPACITY,
        time_budget: Some(Duration::from_secs(10)),
    };
    let mut handles = Vec::with_capacity(N_WORKERS);
    for _ in 0..N_WORKERS {
        let Some(slot) = comms.register_worker() else {
            break;
        };
        handles.push(thread::spawn(move || {
            CompressionWorker::new(slot, worker_config).run();
        }));
    }

    let mut router = SimulatedRouter::new(ROUTER_CAPACITY);
    let outcome = coordinator.run(&mut router);
    for handle in handles {
        let _ = handle.join();
    }

    match outcome {
        Ok(result) => {
            info!(
                midpoint = result.report.midpoint,
                table_entries = result.report.table_entries,
                "compression search succeeded"
            );
            for &(core, merged) in &result.report.merged_by_core {
                info!(core, merged, total = FILTERS_PER_CORE, "core coverage");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "compression search failed");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
