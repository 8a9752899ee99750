// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Platform constants for the search-and-compress engine.
//!
//! These describe the fixed shape of the target hardware: how many processing
//! cores a chip can carry, and how many entries the hardware router holds.

/// Maximum number of processing cores a chip can dedicate to this application.
///
/// The shared coordination table is sized to this, one slot per potential core,
/// whether or not the core is actually available.
pub const MAX_PROCESSORS: usize = 18;

/// Fixed maximum entry count the hardware routing table holds.
///
/// A compression attempt whose minimised table exceeds this has failed; the
/// final best table is installed against this capacity all-or-nothing.
pub const ROUTER_CAPACITY: usize = 1023;

/// Maximum number of distinct route values the minimiser can group.
///
/// The route-frequency histogram is bounded by this; a table with more distinct
/// routes than the router has entry slots cannot be compressed below capacity
/// anyway, so exceeding it is an unconditional failure.
pub const MAX_DISTINCT_ROUTES: usize = 1023;
