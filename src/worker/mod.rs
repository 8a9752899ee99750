// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The compression worker: one minimisation attempt at a time, driven
//! entirely by polling its [`WorkerSlot`].
//!
//! A worker owns no protocol state of its own. Everything it needs to decide
//! what to do next is in the slot, so [`CompressionWorker::poll`] can be
//! called from a dedicated thread loop ([`CompressionWorker::run`]) or
//! single-stepped from a test, with identical behaviour.
//!
//! An attempt ends in exactly one outcome report. For every outcome except a
//! force-stop the worker deposits the table back in the slot first, so the
//! coordinator can adopt a successful result; an acknowledged force-stop
//! drops the table instead, since its verdict is no longer wanted.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::comms::{Instruction, WorkerSlot, WorkerState};
use crate::minimize::{minimise, CancelSignal, MinimiseError};

use std::sync::Arc;

/// Per-worker attempt parameters, fixed for the whole search.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Entry budget a minimised table must fit within.
    pub capacity: usize,
    /// Wall-clock budget per attempt; `None` runs to completion.
    pub time_budget: Option<Duration>,
}

/// What one poll of the slot amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    /// Nothing to do right now; poll again later.
    Idle,
    /// The poll performed work (an attempt, a preparation, an ack).
    Worked,
    /// The slot is retired; stop polling.
    Terminated,
}

/// Cancellation signal for one attempt: fires on a force-stop instruction or
/// on deadline expiry, whichever the minimiser observes first.
struct AttemptSignal<'a> {
    slot: &'a WorkerSlot,
    deadline: Option<Instant>,
}

impl CancelSignal for AttemptSignal<'_> {
    fn is_cancelled(&self) -> bool {
        if self.slot.instruction() == Instruction::ForceStop {
            return true;
        }
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

#[derive(Debug)]
pub struct CompressionWorker {
    slot: Arc<WorkerSlot>,
    config: WorkerConfig,
}

impl CompressionWorker {
    pub fn new(slot: Arc<WorkerSlot>, config: WorkerConfig) -> Self {
        Self { slot, config }
    }

    /// Inspect the slot once and act on it.
    pub fn poll(&mut self) -> WorkerStatus {
        match self.slot.instruction() {
            Instruction::NotAWorker | Instruction::DoNotUse => WorkerStatus::Terminated,
            Instruction::ToBePrepared => WorkerStatus::Idle,
            Instruction::Prepare => {
                if self.slot.state() == WorkerState::Prepared {
                    WorkerStatus::Idle
                } else {
                    debug!("worker prepared");
                    self.slot.report(WorkerState::Prepared);
                    WorkerStatus::Worked
                }
            }
            Instruction::Run => {
                if self.slot.state() == WorkerState::Prepared {
                    self.attempt();
                    WorkerStatus::Worked
                } else {
                    // Outcome already reported; waiting to be collected.
                    WorkerStatus::Idle
                }
            }
            Instruction::ForceStop => {
                if self.slot.state() == WorkerState::ForcedStop {
                    WorkerStatus::Idle
                } else {
                    // The attempt (if any) never started or already finished;
                    // its table is no longer wanted either way.
                    drop(self.slot.take_candidate());
                    self.slot.report(WorkerState::ForcedStop);
                    WorkerStatus::Worked
                }
            }
        }
    }

    /// Run the deposited candidate through the minimiser and report the
    /// outcome.
    fn attempt(&mut self) {
        let Some(mut candidate) = self.slot.take_candidate() else {
            // Run raised before the deposit is visible; poll again.
            return;
        };
        let midpoint = self.slot.midpoint();
        self.slot.report(WorkerState::Compressing);

        let signal = AttemptSignal {
            slot: &self.slot,
            deadline: self.config.time_budget.map(|budget| Instant::now() + budget),
        };
        let arena = self.slot.arena();
        let Some(arena) = arena else {
            debug!(?midpoint, "no arena assigned, reporting malloc failure");
            self.slot.deposit_candidate(candidate);
            self.slot.report(WorkerState::FailedMalloc);
            return;
        };

        let verdict = minimise(candidate.table_mut(), self.config.capacity, &arena, &signal);
        match verdict {
            Ok(()) => {
                info!(?midpoint, entries = candidate.len(), "attempt succeeded");
                self.slot.deposit_candidate(candidate);
                self.slot.report(WorkerState::Success);
            }
            Err(MinimiseError::OutOfMemory(err)) => {
                debug!(?midpoint, %err, "attempt ran out of memory");
                self.slot.deposit_candidate(candidate);
                self.slot.report(WorkerState::FailedMalloc);
            }
            Err(err @ (MinimiseError::TooManyDistinctRoutes { .. }
            | MinimiseError::OverCapacity { .. })) => {
                debug!(?midpoint, %err, "attempt failed to compress");
                self.slot.deposit_candidate(candidate);
                self.slot.report(WorkerState::FailedToCompress);
            }
            Err(MinimiseError::Cancelled) => {
                if self.slot.instruction() == Instruction::ForceStop {
                    info!(?midpoint, "attempt force-stopped");
                    drop(candidate);
                    self.slot.report(WorkerState::ForcedStop);
                } else {
                    info!(?midpoint, "attempt ran out of time");
                    self.slot.deposit_candidate(candidate);
                    self.slot.report(WorkerState::RanOutOfTime);
                }
            }
        }
    }

    /// Poll until the slot is retired, yielding between idle polls.
    pub fn run(mut self) {
        loop {
            match self.poll() {
                WorkerStatus::Terminated => break,
                WorkerStatus::Worked => {}
                WorkerStatus::Idle => thread::yield_now(),
            }
        }
        debug!("worker retired");
    }
}
