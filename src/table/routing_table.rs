// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Ordered routing table with index-based access for the in-place minimiser.

use crate::table::RouteEntry;

/// An ordered sequence of routing entries.
///
/// The minimiser works on the table in place through the indexed accessors;
/// entry order is significant (the hardware matches entries in order, first
/// match wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    entries: Vec<RouteEntry>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn from_entries(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry at `index`. Panics if out of range, like slice indexing.
    pub fn entry(&self, index: usize) -> RouteEntry {
        self.entries[index]
    }

    pub fn set(&mut self, index: usize, entry: RouteEntry) {
        self.entries[index] = entry;
    }

    /// Overwrite the entry at `to` with a copy of the entry at `from`.
    pub fn copy_entry(&mut self, to: usize, from: usize) {
        self.entries[to] = self.entries[from];
    }

    pub fn push(&mut self, entry: RouteEntry) {
        self.entries.push(entry);
    }

    /// Shrink the table to its first `len` entries.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Sort entries ascending by key (stable).
    ///
    /// The uncompressed table arrives from the region store pre-sorted by key;
    /// this re-establishes that order after local edits.
    pub fn sort_by_key(&mut self) {
        self.entries.sort_by_key(|e| e.key_mask.key);
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut Vec<RouteEntry> {
        &mut self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RouteEntry> {
        self.entries.iter()
    }
}
