//! The collaborator a historical cache reads through to.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

/// An ordered, possibly lazily-computed key/value series.
///
/// Only three operations are required: exact lookup plus strict
/// predecessor/successor navigation. The at-or-before and at-or-after
/// helpers are derived from those, and `extract_key` lets a source report
/// an entry's own key when it differs from the navigation key (for example
/// a period key resolving to the last update within the period). Duplicate
/// adjacent entry keys only arise through `extract_key`; the default keeps
/// entry keys identical to navigation keys.
///
/// Navigation must be consistent: `key_before` returns a strictly smaller
/// key for every key past the start of the series, `key_after` a strictly
/// larger one for every key before its end, and `None` beyond either end.
/// A source that clamps at its boundary instead of returning `None` is
/// tolerated by queries but cannot signal exhaustion.
pub trait HistoricalSource<K: Clone, V> {
    /// The value stored exactly at `key`, if any.
    fn load(&self, key: &K) -> Option<V>;

    /// The greatest key strictly before `key`.
    fn key_before(&self, key: &K) -> Option<K>;

    /// The smallest key strictly after `key`.
    fn key_after(&self, key: &K) -> Option<K>;

    /// The entry key for the value found at navigation key `key`.
    fn extract_key(&self, key: &K, _value: &V) -> K {
        key.clone()
    }

    /// The greatest key at or before `key` holding a value.
    fn floor_key(&self, key: &K) -> Option<K> {
        if self.load(key).is_some() {
            Some(key.clone())
        } else {
            self.key_before(key)
        }
    }

    /// The smallest key at or after `key` holding a value.
    fn ceiling_key(&self, key: &K) -> Option<K> {
        if self.load(key).is_some() {
            Some(key.clone())
        } else {
            self.key_after(key)
        }
    }
}

impl<K, V> HistoricalSource<K, V> for BTreeMap<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    fn load(&self, key: &K) -> Option<V> {
        self.get(key).cloned()
    }

    fn key_before(&self, key: &K) -> Option<K> {
        self.range(..key).next_back().map(|(found, _)| found.clone())
    }

    fn key_after(&self, key: &K) -> Option<K> {
        self.range((Excluded(key), Unbounded))
            .next()
            .map(|(found, _)| found.clone())
    }

    fn floor_key(&self, key: &K) -> Option<K> {
        self.range(..=key).next_back().map(|(found, _)| found.clone())
    }

    fn ceiling_key(&self, key: &K) -> Option<K> {
        self.range(key..).next().map(|(found, _)| found.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> BTreeMap<u64, &'static str> {
        BTreeMap::from([(10, "a"), (20, "b"), (30, "c")])
    }

    #[test]
    fn strict_navigation() {
        let source = series();
        assert_eq!(source.key_before(&20), Some(10));
        assert_eq!(source.key_before(&10), None);
        assert_eq!(source.key_after(&20), Some(30));
        assert_eq!(source.key_after(&30), None);
        assert_eq!(source.key_before(&25), Some(20));
        assert_eq!(source.key_after(&25), Some(30));
    }

    #[test]
    fn floor_and_ceiling_include_exact_hits() {
        let source = series();
        assert_eq!(source.floor_key(&20), Some(20));
        assert_eq!(source.floor_key(&25), Some(20));
        assert_eq!(source.floor_key(&5), None);
        assert_eq!(source.ceiling_key(&20), Some(20));
        assert_eq!(source.ceiling_key(&25), Some(30));
        assert_eq!(source.ceiling_key(&35), None);
    }

    #[test]
    fn default_extract_key_is_the_navigation_key() {
        let source = series();
        assert_eq!(source.extract_key(&20, &"b"), 20);
    }
}
