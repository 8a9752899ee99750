// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The search coordinator.
//!
//! One coordinator drives the whole search: it consumes worker outcomes,
//! maintains the feasibility window, picks the next midpoint, and hands
//! attempts to idle workers through the shared coordination table. Like the
//! workers it is poll-driven: [`SearchCoordinator::step`] performs one
//! scheduling pass, so tests can interleave coordinator and worker polls
//! deterministically and [`SearchCoordinator::run`] just loops.
//!
//! Scheduling rules, in order:
//!
//! * Midpoint 0 (the unfiltered baseline) is always tested first. Its
//!   failure is fatal for the whole search.
//! * With the baseline in hand, the full catalog is tried next, so an
//!   entirely feasible catalog costs two attempts rather than a bisection.
//! * Otherwise the longest untested run between the best success and the
//!   lowest failure is split; when that window is empty the idle workforce
//!   is retired and the search ends with the best result found.
//!
//! A success force-stops every running attempt at a strictly smaller
//! midpoint; a failure force-stops every strictly larger one. Either way the
//! stopped attempt's verdict could no longer improve the answer.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::arena::ArenaPool;
use crate::catalog::{build_candidate_table, CandidateTable, SortedBitfieldCatalog};
use crate::comms::{Instruction, SharedCoordinationTable, WorkerSlot, WorkerState};
use crate::machine::{FilterRegion, Router, SearchReport};
use crate::search::errors::FatalError;
use crate::search::state::SearchState;
use crate::table::RoutingTable;

/// Search-wide parameters.
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// Entry budget a winning table must fit within.
    pub capacity: usize,
    /// Entries carved from the pool for each worker's private arena.
    pub worker_arena_entries: usize,
    /// Owner tag for the installed table.
    pub app_id: u32,
}

/// What one scheduling pass amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Outcomes were consumed or attempts dispatched.
    Working,
    /// Nothing to do until a worker changes state.
    Waiting,
    /// Every worker is retired; the search is over.
    Finished,
}

/// The finished search: the installed table and the annotated regions.
#[derive(Debug)]
pub struct CompressedResult {
    pub report: SearchReport,
    pub table: RoutingTable,
    pub regions: Vec<FilterRegion>,
}

#[derive(Debug)]
pub struct SearchCoordinator {
    config: SearchConfig,
    comms: Arc<SharedCoordinationTable>,
    pool: ArenaPool,
    state: SearchState,
    base: RoutingTable,
    catalog: SortedBitfieldCatalog,
    regions: Vec<FilterRegion>,
    best: Option<(usize, CandidateTable)>,
}

impl SearchCoordinator {
    /// Build the catalog from `regions` against `base` and set up an empty
    /// coordination table. Workers register against
    /// [`SearchCoordinator::comms`] before or during the search.
    pub fn new(
        base: RoutingTable,
        regions: Vec<FilterRegion>,
        config: SearchConfig,
    ) -> Result<Self, FatalError> {
        let catalog = SortedBitfieldCatalog::from_regions(&regions, &base)?;
        info!(
            base_entries = base.len(),
            filters = catalog.len(),
            capacity = config.capacity,
            "search set up"
        );
        Ok(Self {
            config,
            comms: Arc::new(SharedCoordinationTable::new()),
            pool: ArenaPool::new(config.worker_arena_entries * crate::constants::MAX_PROCESSORS),
            state: SearchState::new(catalog.len()),
            base,
            catalog,
            regions,
            best: None,
        })
    }

    pub fn comms(&self) -> Arc<SharedCoordinationTable> {
        Arc::clone(&self.comms)
    }

    pub fn best_midpoint(&self) -> Option<usize> {
        self.state.best_success()
    }

    /// One scheduling pass: consume outcomes, dispatch attempts, retire the
    /// idle workforce once the window is exhausted.
    pub fn step(&mut self) -> Result<StepStatus, FatalError> {
        let mut worked = false;

        let slots: Vec<Arc<WorkerSlot>> = self.comms.slots().to_vec();
        for slot in &slots {
            let instruction = slot.instruction();
            if !matches!(instruction, Instruction::Run | Instruction::ForceStop) {
                continue;
            }
            if !slot.state().is_outcome() {
                continue;
            }
            self.process_outcome(slot)?;
            worked = true;
        }

        worked |= self.dispatch_attempts();

        if self.all_done() {
            return Ok(StepStatus::Finished);
        }
        Ok(if worked {
            StepStatus::Working
        } else {
            StepStatus::Waiting
        })
    }

    /// Consume one worker's outcome and re-arm or retire the slot.
    fn process_outcome(&mut self, slot: &Arc<WorkerSlot>) -> Result<(), FatalError> {
        let Some(midpoint) = slot.midpoint() else {
            slot.instruct(Instruction::Prepare);
            return Ok(());
        };
        let outcome = slot.state();
        debug!(midpoint, ?outcome, "outcome received");

        match outcome {
            WorkerState::Success => {
                if let Some(candidate) = slot.take_candidate() {
                    self.on_success(midpoint, candidate);
                }
                slot.clear_midpoint();
                slot.instruct(Instruction::Prepare);
            }
            WorkerState::FailedToCompress | WorkerState::RanOutOfTime => {
                drop(slot.take_candidate());
                slot.clear_midpoint();
                slot.instruct(Instruction::Prepare);
                self.on_failure(midpoint)?;
            }
            WorkerState::FailedMalloc => {
                drop(slot.take_candidate());
                slot.clear_midpoint();
                self.on_malloc_failure(midpoint, slot);
            }
            WorkerState::ForcedStop => {
                // The attempt was abandoned because the window moved past it;
                // no verdict, and none needed.
                slot.clear_midpoint();
                slot.instruct(Instruction::Prepare);
            }
            WorkerState::Unused | WorkerState::Prepared | WorkerState::Compressing => {}
        }
        Ok(())
    }

    /// A midpoint proved feasible: adopt the table if it is the best so far
    /// and stop attempts the answer has moved past.
    fn on_success(&mut self, midpoint: usize, candidate: CandidateTable) {
        info!(midpoint, entries = candidate.len(), "midpoint feasible");
        self.state.record_success(midpoint);
        self.state.clear_malloc_marker();
        if self.best.as_ref().map_or(true, |&(best, _)| midpoint >= best) {
            self.best = Some((midpoint, candidate));
        }
        self.force_stop_running(|running| running < midpoint);
    }

    /// A midpoint proved infeasible. The baseline failing means nothing can
    /// fit, which ends the search.
    fn on_failure(&mut self, midpoint: usize) -> Result<(), FatalError> {
        info!(midpoint, "midpoint infeasible");
        if midpoint == 0 {
            return Err(FatalError::BaselineInfeasible);
        }
        self.state.record_failure(midpoint);
        self.state.clear_malloc_marker();
        self.force_stop_running(|running| running > midpoint);
        Ok(())
    }

    /// A worker ran out of memory: no verdict, so the midpoint goes back in
    /// the window, and the workforce shrinks so the remaining workers' memory
    /// positions improve.
    ///
    /// A repeat failure at the same midpoint keeps shrinking the workforce,
    /// except at midpoint 0, which must stay retryable for as long as any
    /// worker remains. A failure anywhere else resets the marker, so every
    /// other malloc failure costs a worker.
    fn on_malloc_failure(&mut self, midpoint: usize, slot: &Arc<WorkerSlot>) {
        warn!(midpoint, "attempt ran out of memory");
        self.state.clear_tested(midpoint);
        match self.state.malloc_marker() {
            None => {
                self.state.set_malloc_marker(midpoint);
                slot.instruct(Instruction::DoNotUse);
            }
            Some(marker) if marker == midpoint => {
                if midpoint == 0 {
                    slot.instruct(Instruction::Prepare);
                } else {
                    slot.instruct(Instruction::DoNotUse);
                }
            }
            Some(_) => {
                self.state.clear_malloc_marker();
                slot.instruct(Instruction::Prepare);
            }
        }
    }

    fn force_stop_running(&self, overtaken: impl Fn(usize) -> bool) {
        for slot in self.comms.slots() {
            if slot.instruction() != Instruction::Run {
                continue;
            }
            if let Some(running) = slot.midpoint() {
                if overtaken(running) {
                    debug!(midpoint = running, "force-stopping overtaken attempt");
                    slot.instruct(Instruction::ForceStop);
                }
            }
        }
    }

    /// Hand out attempts while there are midpoints to test and idle workers
    /// to take them; retire the idle workforce once the window is empty.
    fn dispatch_attempts(&mut self) -> bool {
        let mut worked = false;
        loop {
            let Some(midpoint) = self.next_midpoint() else {
                worked |= self.retire_idle();
                return worked;
            };
            let Some(slot) = self.find_idle_worker() else {
                worked |= self.prepare_next_worker();
                return worked;
            };
            self.dispatch(midpoint, &slot);
            worked = true;
        }
    }

    /// The midpoint to hand out next, if any.
    fn next_midpoint(&self) -> Option<usize> {
        if !self.state.is_tested(0) {
            return Some(0);
        }
        let n = self.state.n_filters();
        if n == 0 {
            return None;
        }
        // With the baseline in hand, try everything at once before bisecting.
        if !self.state.is_tested(n) && self.state.lowest_failure() > n {
            return Some(n);
        }
        self.state.locate_next_midpoint()
    }

    /// An idle, prepared worker, if one exists.
    fn find_idle_worker(&self) -> Option<Arc<WorkerSlot>> {
        self.comms
            .slots()
            .iter()
            .find(|slot| {
                slot.instruction() == Instruction::Prepare
                    && slot.state() == WorkerState::Prepared
            })
            .map(Arc::clone)
    }

    /// Start preparing one registered-but-unprepared worker: carve its arena
    /// and ask it to come up. Returns true if one was started.
    fn prepare_next_worker(&mut self) -> bool {
        let Some(slot) = self
            .comms
            .slots()
            .iter()
            .find(|slot| slot.instruction() == Instruction::ToBePrepared)
            .map(Arc::clone)
        else {
            return false;
        };
        match self.pool.carve(self.config.worker_arena_entries) {
            Ok(arena) => {
                debug!(entries = arena.capacity(), "worker arena carved");
                slot.set_arena(arena);
                slot.instruct(Instruction::Prepare);
                true
            }
            Err(err) => {
                warn!(%err, "no arena for worker, retiring it");
                slot.instruct(Instruction::DoNotUse);
                true
            }
        }
    }

    /// Build and deposit the candidate for `midpoint` on `slot`.
    fn dispatch(&mut self, midpoint: usize, slot: &Arc<WorkerSlot>) {
        self.state.mark_tested(midpoint);
        let Some(arena) = slot.arena() else {
            slot.instruct(Instruction::DoNotUse);
            self.state.clear_tested(midpoint);
            return;
        };
        match build_candidate_table(&self.base, &self.catalog, midpoint, &arena) {
            Ok(candidate) => {
                debug!(midpoint, entries = candidate.len(), "attempt dispatched");
                slot.deposit_candidate(candidate);
                slot.set_midpoint(midpoint);
                slot.instruct(Instruction::Run);
            }
            Err(err) => {
                // The worker's arena cannot even hold the candidate; retire
                // the worker and put the midpoint back in the window.
                warn!(midpoint, %err, "candidate build failed, retiring worker");
                self.state.clear_tested(midpoint);
                slot.instruct(Instruction::DoNotUse);
            }
        }
    }

    /// Retire workers with nothing left to do. Returns true if any were.
    fn retire_idle(&self) -> bool {
        let mut retired = false;
        for slot in self.comms.slots() {
            if matches!(
                slot.instruction(),
                Instruction::ToBePrepared | Instruction::Prepare
            ) {
                debug!("retiring idle worker");
                slot.instruct(Instruction::DoNotUse);
                retired = true;
            }
        }
        retired
    }

    /// True once no slot holds or awaits an attempt.
    fn all_done(&self) -> bool {
        self.comms
            .slots()
            .iter()
            .all(|slot| !slot.instruction().is_active())
    }

    /// Install the winning table, annotate the regions, publish the answer.
    pub fn finalize(mut self, router: &mut dyn Router) -> Result<CompressedResult, FatalError> {
        let Some((midpoint, mut candidate)) = self.best.take() else {
            let ever_registered = self
                .comms
                .slots()
                .iter()
                .any(|slot| slot.instruction() != Instruction::NotAWorker);
            return Err(if ever_registered {
                FatalError::NoResult
            } else {
                FatalError::NoWorkers
            });
        };

        // The minimiser leaves the table in route-group order; restore key
        // order before it goes to hardware.
        candidate.table_mut().sort_by_key();
        router.install(candidate.table().entries(), self.config.app_id)?;
        self.comms.publish_best_midpoint(midpoint);

        for region in &mut self.regions {
            region.n_merged_filters = self.catalog.merged_for_core(region.core, midpoint);
        }
        let report = SearchReport {
            midpoint,
            table_entries: candidate.len(),
            merged_by_core: self
                .regions
                .iter()
                .map(|region| (region.core, region.n_merged_filters))
                .collect(),
        };
        info!(
            midpoint,
            table_entries = report.table_entries,
            "search finished"
        );
        Ok(CompressedResult {
            report,
            table: candidate.table().clone(),
            regions: self.regions,
        })
    }

    /// Retire every slot still counted as workforce, so worker loops observe
    /// [`Instruction::DoNotUse`] and terminate.
    fn retire_workforce(&self) {
        for slot in self.comms.slots() {
            if slot.instruction().is_active() {
                slot.instruct(Instruction::DoNotUse);
            }
        }
    }

    /// Drive the search to completion, yielding between idle passes, then
    /// finalize against `router`. A fatal error retires the whole workforce
    /// before it propagates, so joining the worker threads cannot block.
    pub fn run(mut self, router: &mut dyn Router) -> Result<CompressedResult, FatalError> {
        loop {
            match self.step() {
                Ok(StepStatus::Finished) => break,
                Ok(StepStatus::Working) => {}
                Ok(StepStatus::Waiting) => thread::sleep(Duration::from_micros(50)),
                Err(err) => {
                    self.retire_workforce();
                    return Err(err);
                }
            }
        }
        self.finalize(router)
    }
}
