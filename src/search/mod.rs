// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The midpoint search: state tracking, the coordinator, and its fatal
//! errors.
//!
//! The atom of the search is the midpoint: fold the K highest-priority
//! filters of the catalog into the base table and ask whether the result
//! minimises under the hardware capacity. [`state::SearchState`] tracks which
//! midpoints were tried and with what verdict;
//! [`coordinator::SearchCoordinator`] turns those verdicts into worker
//! scheduling until the highest feasible midpoint is pinned down.

pub mod coordinator;
pub mod errors;
pub mod state;

pub use coordinator::{CompressedResult, SearchConfig, SearchCoordinator, StepStatus};
pub use errors::FatalError;
pub use state::{MidpointSet, SearchState};
