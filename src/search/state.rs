// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Bookkeeping for the midpoint search.
//!
//! The search space is the midpoints `0..=n` for a catalog of `n` filters.
//! Feasibility is assumed monotone enough to bisect: the state tracks the
//! best midpoint proven feasible, the lowest proven infeasible, and which
//! midpoints have been handed out, and [`SearchState::locate_next_midpoint`]
//! repeatedly splits the longest untested run between those bounds.

/// A dense bitset over the midpoints `0..=n`.
#[derive(Debug, Clone)]
pub struct MidpointSet {
    words: Vec<u64>,
    len: usize,
}

impl MidpointSet {
    /// A set over `0..len`, initially empty.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        self.words[index / 64] & (1 << (index % 64)) != 0
    }

    pub fn insert(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.words[index / 64] |= 1 << (index % 64);
    }

    pub fn remove(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.words[index / 64] &= !(1 << (index % 64));
    }
}

/// The coordinator's view of search progress.
#[derive(Debug)]
pub struct SearchState {
    /// Number of filters in the catalog; midpoints run `0..=n_filters`.
    n_filters: usize,
    /// Midpoints handed to a worker (or whose verdict is in).
    tested: MidpointSet,
    /// Highest midpoint proven feasible so far.
    best_success: Option<usize>,
    /// Lowest midpoint proven infeasible; `n_filters + 1` until one is.
    lowest_failure: usize,
    /// Midpoint of the most recent unresolved malloc failure.
    malloc_marker: Option<usize>,
}

impl SearchState {
    pub fn new(n_filters: usize) -> Self {
        Self {
            n_filters,
            tested: MidpointSet::new(n_filters + 1),
            best_success: None,
            lowest_failure: n_filters + 1,
            malloc_marker: None,
        }
    }

    pub fn n_filters(&self) -> usize {
        self.n_filters
    }

    pub fn best_success(&self) -> Option<usize> {
        self.best_success
    }

    pub fn lowest_failure(&self) -> usize {
        self.lowest_failure
    }

    pub fn is_tested(&self, midpoint: usize) -> bool {
        self.tested.contains(midpoint)
    }

    /// Reserve a midpoint at dispatch so no other worker receives it.
    pub fn mark_tested(&mut self, midpoint: usize) {
        self.tested.insert(midpoint);
    }

    /// Release a reservation whose attempt produced no verdict.
    pub fn clear_tested(&mut self, midpoint: usize) {
        self.tested.remove(midpoint);
    }

    /// A proven-feasible midpoint. Keeps the highest seen.
    pub fn record_success(&mut self, midpoint: usize) {
        self.tested.insert(midpoint);
        if self.best_success.map_or(true, |best| midpoint > best) {
            self.best_success = Some(midpoint);
        }
    }

    /// A proven-infeasible midpoint. Keeps the lowest seen.
    pub fn record_failure(&mut self, midpoint: usize) {
        self.tested.insert(midpoint);
        if midpoint < self.lowest_failure {
            self.lowest_failure = midpoint;
        }
    }

    pub fn malloc_marker(&self) -> Option<usize> {
        self.malloc_marker
    }

    pub fn set_malloc_marker(&mut self, midpoint: usize) {
        self.malloc_marker = Some(midpoint);
    }

    pub fn clear_malloc_marker(&mut self) {
        self.malloc_marker = None;
    }

    /// The midpoint to test next, or `None` when the interesting window is
    /// exhausted.
    ///
    /// The window is the untested midpoints strictly above the best success
    /// and below the lowest failure. The longest untested run in the window
    /// wins (leftmost on a tie) and its upper-biased middle is returned, so
    /// repeated calls bisect.
    pub fn locate_next_midpoint(&self) -> Option<usize> {
        if self.n_filters == 0 {
            return None;
        }
        let lo = self.best_success.map_or(1, |best| best + 1);
        let hi = self.lowest_failure.min(self.n_filters);
        if lo > hi {
            return None;
        }

        let mut best_len = 0;
        let mut best_end = 0;
        let mut run_len = 0;
        for midpoint in lo..=hi {
            if self.tested.contains(midpoint) {
                if run_len > best_len {
                    best_len = run_len;
                    best_end = midpoint - 1;
                }
                run_len = 0;
            } else {
                run_len += 1;
            }
        }
        if run_len > best_len {
            best_len = run_len;
            best_end = hi;
        }
        if best_len == 0 {
            return None;
        }
        Some(best_end - best_len / 2)
    }
}
