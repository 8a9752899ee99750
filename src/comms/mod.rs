// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Shared coordination table between the search coordinator and its workers.
//!
//! There is no message passing. The coordinator and each worker share one
//! [`WorkerSlot`] and communicate by writing fields the other side polls:
//!
//! * `instruction` is written only by the coordinator and read by the worker.
//! * `state` is written only by the worker and read by the coordinator.
//!
//! Each field has exactly one writer, so a reader can see a stale value but
//! never a torn or conflicting one. Hand-off of the candidate table rides on
//! the instruction/state edges: the coordinator deposits a table before
//! raising [`Instruction::Run`], and the worker deposits its result before
//! reporting an outcome state.

use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use strum_macros::FromRepr;

use crate::arena::SubArena;
use crate::catalog::CandidateTable;
use crate::constants::MAX_PROCESSORS;

/// What the coordinator wants a worker to do. Coordinator-written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum Instruction {
    /// This slot has no worker behind it.
    NotAWorker = 0,
    /// A worker exists but has not been given resources yet.
    ToBePrepared = 1,
    /// The worker should set up its resources and report `Prepared`.
    Prepare = 2,
    /// A candidate table is deposited; compress it.
    Run = 3,
    /// Abandon the running attempt; its verdict is no longer wanted.
    ForceStop = 4,
    /// The worker is permanently retired from this search.
    DoNotUse = 5,
}

impl Instruction {
    /// True while the coordinator still counts this slot as workforce.
    pub fn is_active(self) -> bool {
        !matches!(self, Instruction::NotAWorker | Instruction::DoNotUse)
    }
}

/// Where a worker is in its lifecycle. Worker-written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum WorkerState {
    /// No worker has touched this slot.
    Unused = 0,
    /// Resources are set up; waiting for a candidate table.
    Prepared = 1,
    /// An attempt is in progress.
    Compressing = 2,
    /// The deposited table was minimised under capacity.
    Success = 3,
    /// Scratch allocation failed; the midpoint's verdict is unknown.
    FailedMalloc = 4,
    /// The midpoint is infeasible at this capacity.
    FailedToCompress = 5,
    /// The attempt hit its time budget; treated as infeasible.
    RanOutOfTime = 6,
    /// A force-stop was acknowledged; the attempt was discarded.
    ForcedStop = 7,
}

impl WorkerState {
    /// True for the terminal states of one attempt, which the coordinator
    /// consumes before re-dispatching the worker.
    pub fn is_outcome(self) -> bool {
        matches!(
            self,
            WorkerState::Success
                | WorkerState::FailedMalloc
                | WorkerState::FailedToCompress
                | WorkerState::RanOutOfTime
                | WorkerState::ForcedStop
        )
    }
}

/// One coordinator/worker communication slot.
///
/// The atomics carry the polled protocol fields; the mutexes carry the bulky
/// hand-off payloads, each touched only around the matching protocol edge.
#[derive(Debug)]
pub struct WorkerSlot {
    instruction: AtomicU8,
    state: AtomicU8,
    /// The midpoint of the current attempt; -1 when no attempt is assigned.
    midpoint: AtomicI32,
    /// Candidate table in flight, in either direction.
    candidate: Mutex<Option<CandidateTable>>,
    /// The worker's private allocation region, carved at preparation.
    arena: Mutex<Option<Arc<SubArena>>>,
}

impl WorkerSlot {
    pub fn new() -> Self {
        Self {
            instruction: AtomicU8::new(Instruction::NotAWorker as u8),
            state: AtomicU8::new(WorkerState::Unused as u8),
            midpoint: AtomicI32::new(-1),
            candidate: Mutex::new(None),
            arena: Mutex::new(None),
        }
    }

    pub fn instruction(&self) -> Instruction {
        Instruction::from_repr(self.instruction.load(Ordering::Acquire))
            .expect("instruction byte written from a valid Instruction")
    }

    /// Coordinator side: publish a new instruction.
    pub fn instruct(&self, instruction: Instruction) {
        self.instruction.store(instruction as u8, Ordering::Release);
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_repr(self.state.load(Ordering::Acquire))
            .expect("state byte written from a valid WorkerState")
    }

    /// Worker side: publish a new lifecycle state.
    pub fn report(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// The midpoint of the attempt currently assigned, if any.
    pub fn midpoint(&self) -> Option<usize> {
        let value = self.midpoint.load(Ordering::Acquire);
        usize::try_from(value).ok()
    }

    /// Coordinator side: record the midpoint of the attempt being dispatched.
    pub fn set_midpoint(&self, midpoint: usize) {
        self.midpoint.store(midpoint as i32, Ordering::Release);
    }

    /// Coordinator side: mark the slot as holding no attempt.
    pub fn clear_midpoint(&self) {
        self.midpoint.store(-1, Ordering::Release);
    }

    /// Deposit a candidate table for the other side to collect.
    pub fn deposit_candidate(&self, candidate: CandidateTable) {
        *self.candidate.lock() = Some(candidate);
    }

    /// Collect the candidate table the other side deposited, if any.
    pub fn take_candidate(&self) -> Option<CandidateTable> {
        self.candidate.lock().take()
    }

    /// Coordinator side: hand the worker its allocation region.
    pub fn set_arena(&self, arena: Arc<SubArena>) {
        *self.arena.lock() = Some(arena);
    }

    pub fn arena(&self) -> Option<Arc<SubArena>> {
        self.arena.lock().clone()
    }
}

impl Default for WorkerSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// The slots for every possible worker, plus the published result midpoint.
#[derive(Debug)]
pub struct SharedCoordinationTable {
    slots: Vec<Arc<WorkerSlot>>,
    /// The best midpoint found, published once at the end of the search for
    /// external observers; -1 until then.
    best_midpoint: AtomicI32,
}

impl SharedCoordinationTable {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_PROCESSORS).map(|_| Arc::new(WorkerSlot::new())).collect(),
            best_midpoint: AtomicI32::new(-1),
        }
    }

    /// Mark the next free slot as a worker awaiting preparation, returning it.
    /// `None` once all slots are claimed.
    pub fn register_worker(&self) -> Option<Arc<WorkerSlot>> {
        let slot = self
            .slots
            .iter()
            .find(|s| s.instruction() == Instruction::NotAWorker)?;
        slot.instruct(Instruction::ToBePrepared);
        Some(Arc::clone(slot))
    }

    pub fn slots(&self) -> &[Arc<WorkerSlot>] {
        &self.slots
    }

    /// Coordinator side: publish the search's final answer.
    pub fn publish_best_midpoint(&self, midpoint: usize) {
        self.best_midpoint.store(midpoint as i32, Ordering::Release);
    }

    pub fn best_midpoint(&self) -> Option<usize> {
        usize::try_from(self.best_midpoint.load(Ordering::Acquire)).ok()
    }
}

impl Default for SharedCoordinationTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_slot_is_not_a_worker() {
        let slot = WorkerSlot::new();
        assert_eq!(slot.instruction(), Instruction::NotAWorker);
        assert_eq!(slot.state(), WorkerState::Unused);
        assert_eq!(slot.midpoint(), None);
        assert!(slot.take_candidate().is_none());
    }

    #[test]
    fn midpoint_round_trips_through_the_slot() {
        let slot = WorkerSlot::new();
        slot.set_midpoint(17);
        assert_eq!(slot.midpoint(), Some(17));
        slot.clear_midpoint();
        assert_eq!(slot.midpoint(), None);
    }

    #[test]
    fn outcome_states_are_exactly_the_terminal_ones() {
        use WorkerState::*;
        for state in [Success, FailedMalloc, FailedToCompress, RanOutOfTime, ForcedStop] {
            assert!(state.is_outcome(), "{state:?}");
        }
        for state in [Unused, Prepared, Compressing] {
            assert!(!state.is_outcome(), "{state:?}");
        }
    }

    #[test]
    fn register_worker_claims_each_slot_once() {
        let table = SharedCoordinationTable::new();
        for _ in 0..MAX_PROCESSORS {
            let slot = table.register_worker().unwrap();
            assert_eq!(slot.instruction(), Instruction::ToBePrepared);
        }
        assert!(table.register_worker().is_none());
    }

    #[test]
    fn best_midpoint_is_unset_until_published() {
        let table = SharedCoordinationTable::new();
        assert_eq!(table.best_midpoint(), None);
        table.publish_best_midpoint(42);
        assert_eq!(table.best_midpoint(), Some(42));
    }
}
