// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Bitfield-driven routing-table compression search.
//!
//! Folds per-source bitfield filters into a router's uncompressed table and
//! searches for the largest number of filters whose folded table still
//! minimises under the hardware entry capacity.
//!
//! # Architecture
//!
//! The engine is split along the roles of the original on-chip design:
//!
//! ## Coordinator
//!
//! One [`search::SearchCoordinator`] owns the search. It builds the sorted
//! [`catalog::SortedBitfieldCatalog`] once, then bisects over midpoints: a
//! midpoint K means "fold the K highest-priority filters". Verdicts move a
//! feasibility window (best success, lowest failure) until no untested
//! midpoint remains inside it.
//!
//! ## Workers
//!
//! Each [`worker::CompressionWorker`] runs one attempt at a time: take the
//! candidate table deposited in its [`comms::WorkerSlot`], run the
//! [`minimize`] pass against the capacity budget, report exactly one outcome.
//! Workers never talk to each other; everything goes through the slot.
//!
//! ## Shared coordination table
//!
//! There is no message passing. The [`comms`] module holds one slot per
//! possible worker with single-writer fields the other side polls, mirroring
//! the shared-memory protocol of the hardware this design comes from.
//!
//! ## Memory model
//!
//! Workers are memory-constrained by construction: each gets a private
//! [`arena::SubArena`] carved from one [`arena::ArenaPool`], denominated in
//! table entries, and every candidate table and minimiser scratch claim comes
//! out of it. Exhaustion is an ordinary, retryable outcome of the search, not
//! a crash, and tests inject it by shrinking the arenas.

pub mod arena;
pub mod catalog;
pub mod comms;
pub mod constants;
pub mod machine;
pub mod minimize;
pub mod search;
pub mod table;
pub mod worker;

// Re-export commonly used types
pub use catalog::SortedBitfieldCatalog;
pub use search::{CompressedResult, FatalError, SearchConfig, SearchCoordinator};
pub use table::{KeyMask, Route, RouteEntry, RoutingTable};
pub use worker::{CompressionWorker, WorkerConfig};
