// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! KeyMask: a (key, mask) pair defining an address set over a 32-bit space.
//!
//! A bit position with the mask bit set is *fixed*: the address must carry the
//! corresponding key bit there. A position with the mask bit clear is an X
//! (don't care). A KeyMask therefore matches `2^count_xs()` addresses.
//!
//! # Examples
//!
//! ```
//! use bitfield_search::table::KeyMask;
//!
//! let km = KeyMask::new(0b1010_0000, 0b1111_0000);
//! assert!(km.matches(0b1010_0110));
//! assert!(!km.matches(0b1011_0000));
//! assert_eq!(km.count_xs(), 28);
//! ```

use std::fmt;

/// A (key, mask) pair over a fixed-width 32-bit address.
///
/// Invariant: `key & !mask == 0`. Key bits are only meaningful at fixed
/// positions, and all constructors in this crate keep them zero elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyMask {
    /// Required values at the fixed bit positions.
    pub key: u32,
    /// Which bit positions are fixed (1) versus don't-care (0).
    pub mask: u32,
}

impl KeyMask {
    /// Create a new KeyMask.
    ///
    /// Debug builds check the `key & !mask == 0` invariant.
    pub fn new(key: u32, mask: u32) -> Self {
        debug_assert_eq!(key & !mask, 0, "key bits set outside the mask");
        Self { key, mask }
    }

    /// Does this KeyMask match the given address?
    pub fn matches(self, address: u32) -> bool {
        address & self.mask == self.key
    }

    /// The X (don't-care) bit positions, as a bitmap.
    pub fn xs(self) -> u32 {
        !self.key & !self.mask
    }

    /// Number of X positions; the KeyMask matches `2^count_xs()` addresses.
    pub fn count_xs(self) -> u32 {
        self.xs().count_ones()
    }

    /// Do the two KeyMasks match any address in common?
    pub fn intersects(self, other: KeyMask) -> bool {
        self.key & other.mask == other.key & self.mask
    }

    /// The least-specific KeyMask covering both inputs' matched addresses.
    ///
    /// Only bit positions fixed by *both* inputs, with agreeing key bits, stay
    /// fixed; every other position becomes an X. The result matches every
    /// address either input matches, and possibly more: it is a cover, not
    /// the exact union.
    pub fn merge(self, other: KeyMask) -> KeyMask {
        let new_xs = !(self.key ^ other.key);
        let mask = self.mask & other.mask & new_xs;
        KeyMask {
            key: (self.key | other.key) & mask,
            mask,
        }
    }

    /// The most-general KeyMask matching exactly the addresses both inputs
    /// match, or `None` if they are disjoint.
    ///
    /// Dual of [`merge`](Self::merge): the result fixes the union of both
    /// inputs' fixed positions.
    pub fn intersect(self, other: KeyMask) -> Option<KeyMask> {
        if !self.intersects(other) {
            return None;
        }
        let mask = self.mask | other.mask;
        Some(KeyMask {
            key: (self.key | other.key) & mask,
            mask,
        })
    }
}

impl fmt::Display for KeyMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}/{:08x}", self.key, self.mask)
    }
}
