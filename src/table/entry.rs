// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Routing-table entries: a KeyMask, an output route and a source tag.

use crate::table::KeyMask;
use std::fmt;

/// Output-direction encoding of a table entry.
///
/// Opaque to the search: entries are grouped and merged by route equality, and
/// the hardware interprets the bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Route(u32);

impl Route {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// One routing-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    /// Which addresses this entry matches.
    pub key_mask: KeyMask,
    /// Where matched packets are sent.
    pub route: Route,
    /// Core whose packets arrive at this entry, or `None` for "any source".
    pub source: Option<u32>,
}

impl RouteEntry {
    pub fn new(key_mask: KeyMask, route: Route, source: Option<u32>) -> Self {
        Self {
            key_mask,
            route,
            source,
        }
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            Some(core) => write!(f, "{} -> {} (core {})", self.key_mask, self.route, core),
            None => write!(f, "{} -> {}", self.key_mask, self.route),
        }
    }
}
