//! Bounded key/value stores with recency-based eviction.
//!
//! One generic map, [`EvictionMap`], covers all three recency policies; the
//! policies differ only in which operations refresh an entry's position in
//! the recency list (see [`EvictionPolicy`]).

mod map;

pub use map::EvictionMap;

/// Recency policy for an [`EvictionMap`].
///
/// Each policy wraps the same ordered structure; they differ only in the
/// two touch flags below. When the map is over capacity, the entry at the
/// least-recently-qualified end is evicted.
///
/// Note the deliberate asymmetry between `LeastRecentlyModified` (only
/// writes refresh order) and `LeastRecentlyUsed` (reads and writes both
/// refresh order). It is easy to mistake for a bug; the unit tests pin it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvictionPolicy {
    /// Strict insertion-order FIFO: only first-time insertion establishes
    /// an entry's position; neither `get` nor re-`insert` changes it.
    LeastRecentlyAdded,
    /// Re-`insert` of an existing key moves it to the most-recently-used
    /// end; `get` never changes order. The default.
    #[default]
    LeastRecentlyModified,
    /// Both `get` and `insert` move the key to the most-recently-used end.
    LeastRecentlyUsed,
}

impl EvictionPolicy {
    /// Whether a successful `get` refreshes the entry's recency position.
    #[inline]
    pub(crate) fn touch_on_get(self) -> bool {
        matches!(self, EvictionPolicy::LeastRecentlyUsed)
    }

    /// Whether overwriting an existing key refreshes its recency position.
    #[inline]
    pub(crate) fn touch_on_put(self) -> bool {
        !matches!(self, EvictionPolicy::LeastRecentlyAdded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_flags_per_policy() {
        assert!(!EvictionPolicy::LeastRecentlyAdded.touch_on_get());
        assert!(!EvictionPolicy::LeastRecentlyAdded.touch_on_put());
        assert!(!EvictionPolicy::LeastRecentlyModified.touch_on_get());
        assert!(EvictionPolicy::LeastRecentlyModified.touch_on_put());
        assert!(EvictionPolicy::LeastRecentlyUsed.touch_on_get());
        assert!(EvictionPolicy::LeastRecentlyUsed.touch_on_put());
    }

    #[test]
    fn default_policy_is_least_recently_modified() {
        assert_eq!(
            EvictionPolicy::default(),
            EvictionPolicy::LeastRecentlyModified
        );
    }
}
