// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! A single per-source bitfield filter.

use crate::table::KeyMask;

/// A per-source predicate narrowing which addresses a base routing entry
/// matches.
///
/// The redundancy rank is supplied by the region reader: it counts how many
/// packets the filter would stop the source core from receiving needlessly, so
/// higher-redundancy filters are worth folding first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitfieldFilter {
    /// The narrowed address set this filter keeps.
    pub key_mask: KeyMask,
    /// The core whose traffic this filter describes.
    pub source: u32,
    /// Priority rank: redundant packets removed by folding this filter.
    pub redundancy: u32,
}

impl BitfieldFilter {
    pub fn new(key_mask: KeyMask, source: u32, redundancy: u32) -> Self {
        Self {
            key_mask,
            source,
            redundancy,
        }
    }
}
