// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Private sub-arena model for worker memory.
//!
//! Memory on the target is hard-partitioned: a shared pre-claimed pool is
//! carved once into per-worker sub-arenas, and every table or scratch buffer a
//! worker (or the coordinator acting for it) needs is claimed against that
//! worker's arena. An allocation failure in one arena can never corrupt
//! another worker's arena; it surfaces as a retryable malloc-failure outcome in
//! the search protocol, so the budgets here are deliberately injectable by
//! tests.
//!
//! Budgets are counted in routing-table entries, the unit everything in this
//! engine allocates in.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// Allocation failure inside the partitioned memory model.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// A worker's private sub-arena cannot satisfy a claim.
    #[error("sub-arena exhausted: requested {requested} entries, {available} available")]
    Exhausted { requested: usize, available: usize },

    /// The shared pool cannot carve another sub-arena.
    #[error("shared pool exhausted: requested {requested} entries, {available} available")]
    PoolExhausted { requested: usize, available: usize },
}

/// The shared pre-claimed pool that sub-arenas are carved from, once each.
#[derive(Debug)]
pub struct ArenaPool {
    remaining: Mutex<usize>,
}

impl ArenaPool {
    pub fn new(total_entries: usize) -> Self {
        Self {
            remaining: Mutex::new(total_entries),
        }
    }

    /// Carve a private sub-arena of `entries` out of the pool.
    ///
    /// Carved capacity is never returned to the pool; a worker keeps its arena
    /// until process termination.
    pub fn carve(&self, entries: usize) -> Result<Arc<SubArena>, AllocError> {
        let mut remaining = self.remaining.lock();
        if *remaining < entries {
            return Err(AllocError::PoolExhausted {
                requested: entries,
                available: *remaining,
            });
        }
        *remaining -= entries;
        Ok(Arc::new(SubArena {
            capacity: entries,
            used: AtomicUsize::new(0),
        }))
    }

    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }
}

/// One worker's private slice of the pool.
#[derive(Debug)]
pub struct SubArena {
    capacity: usize,
    used: AtomicUsize,
}

impl SubArena {
    /// Claim `entries` from this arena, released when the claim is dropped.
    pub fn claim(self: &Arc<Self>, entries: usize) -> Result<ArenaClaim, AllocError> {
        let result = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                if self.capacity - used >= entries {
                    Some(used + entries)
                } else {
                    None
                }
            });
        match result {
            Ok(_) => Ok(ArenaClaim {
                arena: Arc::clone(self),
                entries,
            }),
            Err(used) => Err(AllocError::Exhausted {
                requested: entries,
                available: self.capacity - used,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.capacity - self.used.load(Ordering::Acquire)
    }

    fn release(&self, entries: usize) {
        self.used.fetch_sub(entries, Ordering::AcqRel);
    }
}

/// RAII claim against a [`SubArena`]; dropping it releases the budget.
#[derive(Debug)]
pub struct ArenaClaim {
    arena: Arc<SubArena>,
    entries: usize,
}

impl ArenaClaim {
    pub fn entries(&self) -> usize {
        self.entries
    }
}

impl Drop for ArenaClaim {
    fn drop(&mut self) {
        self.arena.release(self.entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carve_reduces_the_pool() {
        let pool = ArenaPool::new(100);
        let arena = pool.carve(60).unwrap();
        assert_eq!(pool.remaining(), 40);
        assert_eq!(arena.capacity(), 60);
        assert!(matches!(
            pool.carve(41),
            Err(AllocError::PoolExhausted { requested: 41, available: 40 })
        ));
    }

    #[test]
    fn claims_release_on_drop() {
        let pool = ArenaPool::new(10);
        let arena = pool.carve(10).unwrap();
        let claim = arena.claim(7).unwrap();
        assert_eq!(arena.available(), 3);
        assert!(arena.claim(4).is_err());
        drop(claim);
        assert_eq!(arena.available(), 10);
        assert!(arena.claim(10).is_ok());
    }

    #[test]
    fn exhausted_claim_reports_availability() {
        let pool = ArenaPool::new(5);
        let arena = pool.carve(5).unwrap();
        let _held = arena.claim(3).unwrap();
        let err = arena.claim(3).unwrap_err();
        assert_eq!(
            err,
            AllocError::Exhausted {
                requested: 3,
                available: 2
            }
        );
    }
}
