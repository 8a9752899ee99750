// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Property tests for the KeyMask merge algebra and the minimiser.
//!
//! The load-bearing property is route preservation: for a table of mutually
//! disjoint entries, minimisation may generalise entries onto unowned
//! addresses but must never change the route of an owned one.

use std::sync::Arc;

use proptest::prelude::*;

use bitfield_search::arena::{ArenaPool, SubArena};
use bitfield_search::minimize::{minimise, MinimiseError, NeverCancel};
use bitfield_search::{KeyMask, Route, RouteEntry, RoutingTable};

/// An arbitrary well-formed KeyMask: key bits only where the mask cares.
fn key_mask() -> impl Strategy<Value = KeyMask> {
    (any::<u32>(), any::<u32>()).prop_map(|(key, mask)| KeyMask::new(key & mask, mask))
}

/// A table of mutually disjoint entries: per-address entries over a small
/// address space, each present or absent, with one of three routes.
///
/// Eight addresses over three bits keeps the space small enough that
/// exhaustive route lookup over every address is cheap.
fn disjoint_table() -> impl Strategy<Value = RoutingTable> {
    proptest::collection::vec(proptest::option::of(1u32..=3), 8).prop_map(|routes| {
        RoutingTable::from_entries(
            routes
                .into_iter()
                .enumerate()
                .filter_map(|(address, route)| {
                    route.map(|route| {
                        RouteEntry::new(
                            KeyMask::new(address as u32, 0xFFFF_FFFF),
                            Route::new(route),
                            None,
                        )
                    })
                })
                .collect(),
        )
    })
}

/// First-match route lookup, as the hardware would do it.
fn lookup(table: &RoutingTable, address: u32) -> Option<Route> {
    table
        .iter()
        .find(|entry| entry.key_mask.matches(address))
        .map(|entry| entry.route)
}

fn big_arena() -> Arc<SubArena> {
    ArenaPool::new(4096).carve(4096).unwrap()
}

proptest! {
    #[test]
    fn merge_is_commutative(a in key_mask(), b in key_mask()) {
        prop_assert_eq!(a.merge(b), b.merge(a));
    }

    #[test]
    fn merge_covers_both_inputs(a in key_mask(), b in key_mask()) {
        let merged = a.merge(b);
        prop_assert!(merged.intersects(a));
        prop_assert!(merged.intersects(b));
        // Every address either input matches, the merge matches.
        prop_assert_eq!(a.key & merged.mask, merged.key);
        prop_assert_eq!(b.key & merged.mask, merged.key);
    }

    #[test]
    fn intersects_is_symmetric(a in key_mask(), b in key_mask()) {
        prop_assert_eq!(a.intersects(b), b.intersects(a));
    }

    #[test]
    fn intersect_is_exactly_the_common_addresses(a in key_mask(), b in key_mask()) {
        match a.intersect(b) {
            Some(common) => {
                prop_assert!(a.intersects(b));
                for address in 0..64u32 {
                    prop_assert_eq!(
                        common.matches(address),
                        a.matches(address) && b.matches(address)
                    );
                }
            }
            None => prop_assert!(!a.intersects(b)),
        }
    }

    #[test]
    fn minimisation_preserves_owned_routes(table in disjoint_table()) {
        let mut minimised = table.clone();
        minimise(&mut minimised, 1023, &big_arena(), &NeverCancel).unwrap();

        prop_assert!(minimised.len() <= table.len());
        for entry in table.iter() {
            let address = entry.key_mask.key;
            prop_assert_eq!(lookup(&minimised, address), Some(entry.route));
        }
    }

    #[test]
    fn minimisation_fits_the_capacity_or_says_why_not(
        table in disjoint_table(),
        capacity in 0usize..6,
    ) {
        let mut minimised = table.clone();
        match minimise(&mut minimised, capacity, &big_arena(), &NeverCancel) {
            Ok(()) => prop_assert!(minimised.len() <= capacity),
            Err(MinimiseError::OverCapacity { entries, capacity: reported }) => {
                prop_assert_eq!(reported, capacity);
                prop_assert!(entries > capacity);
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }
}
