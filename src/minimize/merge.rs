// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The pairwise entry merge rule.

use crate::table::RouteEntry;

/// Merge two entries sharing a route into one.
///
/// The merged KeyMask is the least-specific cover of both inputs' address
/// sets; the source tag survives only if both inputs agree, otherwise the
/// merged entry matches "any source". Callers only merge entries with equal
/// routes, so the route carries over from the left input.
pub fn merge_entries(left: RouteEntry, right: RouteEntry) -> RouteEntry {
    debug_assert_eq!(left.route, right.route, "only same-route entries merge");
    RouteEntry {
        key_mask: left.key_mask.merge(right.key_mask),
        route: left.route,
        source: if left.source == right.source {
            left.source
        } else {
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{KeyMask, Route};

    fn entry(key: u32, mask: u32, source: Option<u32>) -> RouteEntry {
        RouteEntry::new(KeyMask::new(key, mask), Route::new(6), source)
    }

    #[test]
    fn merge_is_commutative() {
        let a = entry(0x40, 0xF0, Some(1));
        let b = entry(0x50, 0xF0, Some(2));
        assert_eq!(merge_entries(a, b), merge_entries(b, a));
    }

    #[test]
    fn merged_key_mask_covers_both_inputs() {
        let a = entry(0x40, 0xF0, None);
        let b = entry(0x50, 0xF0, None);
        let merged = merge_entries(a, b);
        for addr in 0x00..=0xFF {
            if a.key_mask.matches(addr) || b.key_mask.matches(addr) {
                assert!(merged.key_mask.matches(addr));
            }
        }
    }

    #[test]
    fn source_survives_only_on_agreement() {
        let a = entry(0x40, 0xF0, Some(3));
        let b = entry(0x50, 0xF0, Some(3));
        assert_eq!(merge_entries(a, b).source, Some(3));

        let c = entry(0x50, 0xF0, Some(4));
        assert_eq!(merge_entries(a, c).source, None);
        assert_eq!(merge_entries(a, entry(0x50, 0xF0, None)).source, None);
    }
}
