// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Routing-table minimisation.
//!
//! Pure, deterministic, per-attempt algorithm run by a compression worker
//! against one candidate table and a capacity budget:
//!
//! 1. Histogram the distinct route values (bounded by
//!    [`MAX_DISTINCT_ROUTES`]; exceeding it is an unconditional failure).
//! 2. Stable-sort the distinct routes ascending by frequency, ties keeping
//!    first-seen order, so rarer routes are grouped first.
//! 3. Physically reorder the table so entries sharing a route are contiguous,
//!    in the frequency-rank order of step 2.
//! 4. Within each same-route group, repeatedly merge pairs whose merged
//!    KeyMask conflicts with no entry beyond the current compaction window,
//!    compacting the group as merges land and committing unmergeable entries
//!    to the output cursor.
//! 5. Shrink the table to the output cursor; over-capacity is failure.
//!
//! Cancellation is polled between the coarse phases only; a cancelled run
//! discards partial work and the caller releases the memory.

pub mod cancel;
pub mod merge;

pub use cancel::{CancelAfter, CancelSignal, NeverCancel};
pub use merge::merge_entries;

use std::sync::Arc;

use crate::arena::{AllocError, SubArena};
use crate::constants::MAX_DISTINCT_ROUTES;
use crate::table::{Route, RoutingTable};

use thiserror::Error;
use tracing::{debug, info};

/// Why a minimisation attempt did not produce a fitting table.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MinimiseError {
    /// More distinct route values than the minimiser can group. The table
    /// shape is un-mergeable; retrying cannot help.
    #[error("table has {found} distinct routes, above the limit of {max}")]
    TooManyDistinctRoutes { found: usize, max: usize },

    /// The fully minimised table still exceeds the capacity budget.
    #[error("minimised table needs {entries} entries, over the capacity of {capacity}")]
    OverCapacity { entries: usize, capacity: usize },

    /// Scratch space could not be claimed; unknown verdict, retryable.
    #[error("minimiser scratch allocation failed: {0}")]
    OutOfMemory(#[from] AllocError),

    /// A stop request was observed at a phase boundary.
    #[error("compression attempt cancelled")]
    Cancelled,
}

/// Route-frequency histogram cell.
struct RouteCount {
    route: Route,
    frequency: u32,
}

/// Minimise `table` in place under `capacity`, claiming scratch from `arena`
/// and polling `cancel` between coarse phases.
///
/// On success the table is shrunk to its minimised size. On any error the
/// table contents are unspecified (partial work is discarded by the caller
/// dropping the candidate).
pub fn minimise(
    table: &mut RoutingTable,
    capacity: usize,
    arena: &Arc<SubArena>,
    cancel: &dyn CancelSignal,
) -> Result<(), MinimiseError> {
    let n = table.len();

    // Histogram scratch is the attempt's only allocation; failing to claim it
    // is the malloc-failure outcome, not a verdict on the table.
    let _scratch = arena.claim(n.min(MAX_DISTINCT_ROUTES))?;

    // Phase 1: distinct-route histogram, first-seen order.
    let mut routes: Vec<RouteCount> = Vec::new();
    for index in 0..n {
        let route = table.entry(index).route;
        match routes.iter_mut().find(|c| c.route == route) {
            Some(cell) => cell.frequency += 1,
            None => {
                if routes.len() >= MAX_DISTINCT_ROUTES {
                    return Err(MinimiseError::TooManyDistinctRoutes {
                        found: routes.len() + 1,
                        max: MAX_DISTINCT_ROUTES,
                    });
                }
                routes.push(RouteCount {
                    route,
                    frequency: 1,
                });
            }
        }
    }
    debug!(entries = n, distinct_routes = routes.len(), "histogram built");

    // Phase 2: rarest routes first; stable, so ties keep first-seen order.
    routes.sort_by_key(|c| c.frequency);
    if cancel.is_cancelled() {
        info!("stopping after route sort as asked to stop");
        return Err(MinimiseError::Cancelled);
    }

    // Phase 3: reorder the table into contiguous same-route groups in
    // frequency-rank order. Stable, so entries within a group keep their
    // original relative order.
    let rank = |route: Route| -> usize {
        routes
            .iter()
            .position(|c| c.route == route)
            .unwrap_or(routes.len())
    };
    let mut reordered: Vec<(usize, crate::table::RouteEntry)> = table
        .entries()
        .iter()
        .map(|&e| (rank(e.route), e))
        .collect();
    reordered.sort_by_key(|&(r, _)| r);
    for (index, &(_, entry)) in reordered.iter().enumerate() {
        table.set(index, entry);
    }
    if cancel.is_cancelled() {
        info!("stopping before compression as asked to stop");
        return Err(MinimiseError::Cancelled);
    }

    // Phase 4: pairwise merging, group by group.
    let mut write_index = 0;
    let mut left = 0;
    while left < n {
        let left_route = table.entry(left).route;
        let mut right = left;
        while right + 1 < n && table.entry(right + 1).route == left_route {
            right += 1;
        }
        let remaining_index = right + 1;
        compress_by_route(table, left, right, remaining_index, &mut write_index);
        if write_index > capacity {
            return Err(MinimiseError::OverCapacity {
                entries: write_index,
                capacity,
            });
        }
        if cancel.is_cancelled() {
            info!("stopping during compression as asked to stop");
            return Err(MinimiseError::Cancelled);
        }
        left = remaining_index;
    }

    // Phase 5: shrink to the write cursor.
    table.truncate(write_index);
    debug!(entries = write_index, "minimisation finished");
    Ok(())
}

/// Compact one contiguous same-route group `[left, right]`.
///
/// For an unmerged left entry, scan later group members for a partner whose
/// merged KeyMask conflicts with no entry at or beyond `remaining_index` (the
/// entries not yet processed). On a merge, the result replaces the left entry
/// and the group's last unswept member relocates into the vacated slot. An
/// entry with no partner commits to the next output slot.
fn compress_by_route(
    table: &mut RoutingTable,
    mut left: usize,
    mut right: usize,
    remaining_index: usize,
    write_index: &mut usize,
) {
    while left < right {
        let mut merged = false;
        let mut index = left + 1;
        while index <= right {
            if find_merge(table, left, index, remaining_index) {
                table.copy_entry(index, right);
                right -= 1;
                merged = true;
                break;
            }
            index += 1;
        }
        if !merged {
            table.copy_entry(*write_index, left);
            *write_index += 1;
            left += 1;
        }
    }
    if left == right {
        table.copy_entry(*write_index, left);
        *write_index += 1;
    }
}

/// Try to merge the entries at `left` and `index`.
///
/// The merge is rejected if the merged KeyMask would ambiguously match
/// addresses owned by any entry not yet processed, which would silently
/// misroute them. On success the merged entry replaces the left entry.
fn find_merge(table: &mut RoutingTable, left: usize, index: usize, remaining_index: usize) -> bool {
    let merged = merge_entries(table.entry(left), table.entry(index));
    for check in remaining_index..table.len() {
        if table.entry(check).key_mask.intersects(merged.key_mask) {
            return false;
        }
    }
    table.set(left, merged);
    true
}
