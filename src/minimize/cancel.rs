// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Advisory cancellation for compression attempts.
//!
//! Cancellation is cooperative: the minimiser polls a signal at its coarse
//! phase boundaries (after the frequency sort, after the physical reorder, and
//! after each compaction group) and discards partial work when told to stop.
//! There is no preemption; interrupted compaction state is not safely
//! resumable, so the granularity is deliberately coarse.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};

/// A polled stop request.
pub trait CancelSignal {
    fn is_cancelled(&self) -> bool;
}

/// A signal that never fires, for callers running to completion.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

// Shared-flag signal: another core (or thread) raises the flag, the
// minimiser observes it eventually. Visibility, not notification.
impl CancelSignal for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// Test signal that fires after a fixed number of polls, for exercising each
/// cancellation point deterministically.
#[derive(Debug)]
pub struct CancelAfter {
    remaining: Cell<usize>,
}

impl CancelAfter {
    pub fn new(polls: usize) -> Self {
        Self {
            remaining: Cell::new(polls),
        }
    }
}

impl CancelSignal for CancelAfter {
    fn is_cancelled(&self) -> bool {
        let left = self.remaining.get();
        if left == 0 {
            true
        } else {
            self.remaining.set(left - 1);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_after_counts_polls() {
        let signal = CancelAfter::new(2);
        assert!(!signal.is_cancelled());
        assert!(!signal.is_cancelled());
        assert!(signal.is_cancelled());
        assert!(signal.is_cancelled());
    }
}
