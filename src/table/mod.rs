// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Routing-table data model.
//!
//! A routing table is an ordered sequence of entries, each matching a set of
//! addresses through a [`KeyMask`] and naming a [`Route`] (output directions)
//! for packets whose address it matches. The table is bounded by the hardware
//! capacity, but that bound is enforced by the minimiser and the router install
//! step rather than by the type: candidate tables legitimately exceed it before
//! minimisation.

pub mod entry;
pub mod key_mask;
pub mod routing_table;

pub use entry::{Route, RouteEntry};
pub use key_mask::KeyMask;
pub use routing_table::RoutingTable;
