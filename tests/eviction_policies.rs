// ==============================================
// EVICTION POLICY TESTS (integration)
// ==============================================
//
// Cross-policy behavioral consistency of the bounded eviction map: the
// three recency policies must agree on everything except which touches
// refresh an entry's position.

use chronocache::eviction::{EvictionMap, EvictionPolicy};

const ALL_POLICIES: [EvictionPolicy; 3] = [
    EvictionPolicy::LeastRecentlyAdded,
    EvictionPolicy::LeastRecentlyModified,
    EvictionPolicy::LeastRecentlyUsed,
];

// ==============================================
// Shared Contract
// ==============================================

mod shared_contract {
    use super::*;

    #[test]
    fn size_never_exceeds_maximum() {
        for policy in ALL_POLICIES {
            let mut map = EvictionMap::new(policy, 16);
            for key in 0..1000u64 {
                map.insert(key, key);
                assert!(map.len() <= 16, "{policy:?} exceeded its maximum size");
                map.check_invariants().unwrap();
            }
        }
    }

    #[test]
    fn overflow_evicts_exactly_one() {
        for policy in ALL_POLICIES {
            let mut map = EvictionMap::new(policy, 3);
            for key in 0..3u64 {
                map.insert(key, key);
            }
            map.insert(3, 3);
            assert_eq!(map.len(), 3, "{policy:?} evicted more than one entry");
        }
    }

    #[test]
    fn capacity_zero_retains_nothing() {
        for policy in ALL_POLICIES {
            let mut map = EvictionMap::new(policy, 0);
            map.insert(1u64, 1u64);
            assert!(map.is_empty(), "{policy:?} retained an entry at capacity 0");
            assert_eq!(map.get(&1), None);
        }
    }

    #[test]
    fn peek_never_disturbs_eviction_order() {
        for policy in ALL_POLICIES {
            let mut map = EvictionMap::new(policy, 2);
            map.insert(1u64, 1u64);
            map.insert(2, 2);
            map.peek(&1);
            map.insert(3, 3);
            assert!(!map.contains(&1), "{policy:?} let peek refresh an entry");
        }
    }
}

// ==============================================
// Policy Asymmetry
// ==============================================
//
// The one place the policies differ: which operations count as a touch.

mod policy_asymmetry {
    use super::*;

    fn filled(policy: EvictionPolicy) -> EvictionMap<u64, u64> {
        let mut map = EvictionMap::new(policy, 3);
        for key in 1..=3u64 {
            map.insert(key, key * 10);
        }
        map
    }

    #[test]
    fn get_refreshes_only_under_lru() {
        for policy in ALL_POLICIES {
            let mut map = filled(policy);
            map.get(&1);
            map.insert(4, 40);
            let expect_survivor = policy == EvictionPolicy::LeastRecentlyUsed;
            assert_eq!(
                map.contains(&1),
                expect_survivor,
                "{policy:?} mishandled a get touch"
            );
        }
    }

    #[test]
    fn reinsert_refreshes_under_lrm_and_lru() {
        for policy in ALL_POLICIES {
            let mut map = filled(policy);
            map.insert(1, 11);
            map.insert(4, 40);
            let expect_survivor = policy != EvictionPolicy::LeastRecentlyAdded;
            assert_eq!(
                map.contains(&1),
                expect_survivor,
                "{policy:?} mishandled a re-insert touch"
            );
            // The overwrite itself must stick regardless of policy.
            if expect_survivor {
                assert_eq!(map.peek(&1), Some(&11));
            }
        }
    }

    #[test]
    fn least_recently_modified_reference_scenario() {
        // Three inserts, a refresh of the oldest by overwrite, then an
        // overflow: the refreshed entry survives, the next-oldest goes.
        let mut map = EvictionMap::new(EvictionPolicy::LeastRecentlyModified, 3);
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);
        map.insert("a", 4);
        map.insert("d", 5);
        assert!(map.contains(&"a"));
        assert!(!map.contains(&"b"));
        assert!(map.contains(&"c"));
        assert!(map.contains(&"d"));
        assert_eq!(map.peek(&"a"), Some(&4));
    }
}

// ==============================================
// Recency Introspection
// ==============================================

mod recency_order {
    use super::*;

    #[test]
    fn keys_by_recency_tracks_touches() {
        let mut map = EvictionMap::new(EvictionPolicy::LeastRecentlyUsed, 4);
        for key in 1..=4u64 {
            map.insert(key, key);
        }
        map.get(&2);
        // Most recent first.
        assert_eq!(map.keys_by_recency(), vec![2, 4, 3, 1]);
        assert_eq!(map.pop_back(), Some((1, 1)));
        map.check_invariants().unwrap();
    }
}
