//! Capacity-limited map with policy-driven recency eviction.
//!
//! `EvictionMap` combines an `FxHashMap` index with an intrusive doubly
//! linked list ordered by recency. The front of the list is the most
//! recently qualified entry, the back is the next eviction candidate.
//! All operations are O(1).

use std::hash::Hash;
use std::mem;
use std::ptr::NonNull;

use rustc_hash::FxHashMap;

use crate::error::InvariantError;
use crate::eviction::EvictionPolicy;

/// Node in the recency list.
///
/// List pointers come first so traversal touches one cache line before the
/// key and value.
#[repr(C)]
struct Node<K, V> {
    prev: Option<NonNull<Node<K, V>>>,
    next: Option<NonNull<Node<K, V>>>,
    key: K,
    value: V,
}

/// A bounded map that evicts exactly one entry per over-capacity insertion.
///
/// Which operations refresh an entry's recency position is decided by the
/// [`EvictionPolicy`] chosen at construction; everything else is shared.
/// The size after any single call never exceeds `maximum_size`, and no
/// entry is lost except through eviction or explicit [`remove`](Self::remove).
///
/// # Example
///
/// ```
/// use chronocache::eviction::{EvictionMap, EvictionPolicy};
///
/// let mut map = EvictionMap::new(EvictionPolicy::LeastRecentlyUsed, 2);
/// map.insert("a", 1);
/// map.insert("b", 2);
/// map.get(&"a"); // refreshes "a" under LRU
/// map.insert("c", 3); // evicts "b"
/// assert!(map.contains(&"a"));
/// assert!(!map.contains(&"b"));
/// ```
pub struct EvictionMap<K, V> {
    index: FxHashMap<K, NonNull<Node<K, V>>>,
    head: Option<NonNull<Node<K, V>>>,
    tail: Option<NonNull<Node<K, V>>>,
    maximum_size: usize,
    policy: EvictionPolicy,
}

impl<K, V> EvictionMap<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty map holding at most `maximum_size` entries.
    ///
    /// A `maximum_size` of zero is honored: such a map retains nothing.
    pub fn new(policy: EvictionPolicy, maximum_size: usize) -> Self {
        Self {
            index: FxHashMap::with_capacity_and_hasher(maximum_size, Default::default()),
            head: None,
            tail: None,
            maximum_size,
            policy,
        }
    }

    /// Returns the number of entries currently held.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the map holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the configured maximum size.
    #[inline]
    pub fn maximum_size(&self) -> usize {
        self.maximum_size
    }

    /// Returns the active eviction policy.
    #[inline]
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Returns `true` if the key is present. Never refreshes order.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Looks up a value, applying the policy's touch-on-get semantics.
    #[inline]
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let node_ptr = *self.index.get(key)?;
        if self.policy.touch_on_get() {
            self.unlink(node_ptr);
            self.push_front(node_ptr);
        }
        // SAFETY: node_ptr stays valid while the key is in the index.
        Some(unsafe { &(*node_ptr.as_ptr()).value })
    }

    /// Looks up a value without refreshing order under any policy.
    #[inline]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.index
            .get(key)
            .map(|node_ptr| unsafe { &(*node_ptr.as_ptr()).value })
    }

    /// Inserts or overwrites an entry, returning the previous value.
    ///
    /// Overwriting applies the policy's touch-on-put semantics. Inserting a
    /// new key into a full map evicts the entry at the back of the recency
    /// list within the same call, so the size after return is always
    /// `<= maximum_size`.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&node_ptr) = self.index.get(&key) {
            let old_value = unsafe {
                let node = node_ptr.as_ptr();
                mem::replace(&mut (*node).value, value)
            };
            if self.policy.touch_on_put() {
                self.unlink(node_ptr);
                self.push_front(node_ptr);
            }
            return Some(old_value);
        }

        if self.maximum_size == 0 {
            return None;
        }
        if self.index.len() >= self.maximum_size {
            self.pop_back();
        }

        let node = Box::new(Node {
            prev: None,
            next: None,
            key: key.clone(),
            value,
        });
        let node_ptr = NonNull::from(Box::leak(node));
        self.index.insert(key, node_ptr);
        self.push_front(node_ptr);
        None
    }

    /// Removes an entry by key, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let node_ptr = self.index.remove(key)?;
        self.unlink(node_ptr);
        // SAFETY: the node is no longer referenced by the index or list.
        let node = unsafe { Box::from_raw(node_ptr.as_ptr()) };
        Some(node.value)
    }

    /// Removes and returns the current eviction candidate.
    pub fn pop_back(&mut self) -> Option<(K, V)> {
        let tail_ptr = self.tail?;
        // SAFETY: tail is valid while Some.
        let key = unsafe { (*tail_ptr.as_ptr()).key.clone() };
        self.index.remove(&key);
        self.unlink(tail_ptr);
        let node = unsafe { Box::from_raw(tail_ptr.as_ptr()) };
        Some((node.key, node.value))
    }

    /// Peeks at the current eviction candidate without removing it.
    pub fn peek_back(&self) -> Option<(&K, &V)> {
        self.tail.map(|node_ptr| unsafe {
            let node = node_ptr.as_ptr();
            (&(*node).key, &(*node).value)
        })
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        while self.pop_back().is_some() {}
    }

    /// Returns the keys from most to least recently qualified.
    ///
    /// Intended for tests and diagnostics; O(n).
    pub fn keys_by_recency(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut current = self.head;
        while let Some(node_ptr) = current {
            unsafe {
                keys.push((*node_ptr.as_ptr()).key.clone());
                current = (*node_ptr.as_ptr()).next;
            }
        }
        keys
    }

    /// Validates internal consistency between the index and the list.
    ///
    /// Intended for debug assertions and tests.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.index.len() > self.maximum_size {
            return Err(InvariantError::new(format!(
                "size {} exceeds maximum size {}",
                self.index.len(),
                self.maximum_size
            )));
        }
        let mut seen = 0usize;
        let mut prev: Option<NonNull<Node<K, V>>> = None;
        let mut current = self.head;
        while let Some(node_ptr) = current {
            unsafe {
                let node = node_ptr.as_ptr();
                if (*node).prev != prev {
                    return Err(InvariantError::new("list back-pointer mismatch"));
                }
                if !self.index.contains_key(&(*node).key) {
                    return Err(InvariantError::new("list node missing from index"));
                }
                prev = current;
                current = (*node).next;
            }
            seen += 1;
            if seen > self.index.len() {
                return Err(InvariantError::new("list longer than index (cycle?)"));
            }
        }
        if seen != self.index.len() {
            return Err(InvariantError::new(format!(
                "list length {} does not match index length {}",
                seen,
                self.index.len()
            )));
        }
        if self.tail != prev {
            return Err(InvariantError::new("tail does not point at last node"));
        }
        Ok(())
    }

    // =========================================================================
    // Internal linked-list operations
    // =========================================================================

    #[inline]
    fn unlink(&mut self, node_ptr: NonNull<Node<K, V>>) {
        unsafe {
            let node = node_ptr.as_ptr();
            let prev = (*node).prev;
            let next = (*node).next;
            match prev {
                Some(prev_ptr) => (*prev_ptr.as_ptr()).next = next,
                None => self.head = next,
            }
            match next {
                Some(next_ptr) => (*next_ptr.as_ptr()).prev = prev,
                None => self.tail = prev,
            }
            (*node).prev = None;
            (*node).next = None;
        }
    }

    #[inline]
    fn push_front(&mut self, node_ptr: NonNull<Node<K, V>>) {
        unsafe {
            let node = node_ptr.as_ptr();
            (*node).prev = None;
            (*node).next = self.head;
            match self.head {
                Some(head_ptr) => (*head_ptr.as_ptr()).prev = Some(node_ptr),
                None => self.tail = Some(node_ptr),
            }
            self.head = Some(node_ptr);
        }
    }
}

impl<K, V> Drop for EvictionMap<K, V> {
    fn drop(&mut self) {
        let mut current = self.head;
        while let Some(node_ptr) = current {
            unsafe {
                let node = Box::from_raw(node_ptr.as_ptr());
                current = node.next;
            }
        }
    }
}

impl<K, V> std::fmt::Debug for EvictionMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvictionMap")
            .field("len", &self.index.len())
            .field("maximum_size", &self.maximum_size)
            .field("policy", &self.policy)
            .finish()
    }
}

// SAFETY: the raw node pointers are owned exclusively by this map.
unsafe impl<K: Send, V: Send> Send for EvictionMap<K, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(policy: EvictionPolicy, maximum_size: usize) -> EvictionMap<&'static str, i32> {
        EvictionMap::new(policy, maximum_size)
    }

    #[test]
    fn least_recently_modified_is_removed() {
        // Capacity-3 reference scenario: puts refresh order, gets do not.
        let mut map = map(EvictionPolicy::LeastRecentlyModified, 3);
        map.insert("1", 1);
        map.insert("2", 2);
        map.insert("3", 3);
        assert_eq!(map.len(), 3);
        map.insert("4", 4);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&"1"), None);
        map.insert("4", 4);
        map.insert("3", 3);
        map.insert("2", 2);
        map.get(&"4");
        map.get(&"2");
        assert_eq!(map.len(), 3);
        map.insert("5", 5);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&"1"), None);
        assert_eq!(map.get(&"4"), None);
        map.check_invariants().unwrap();
    }

    #[test]
    fn least_recently_used_refreshes_on_get() {
        // Same access pattern as the LRM scenario diverges under LRU: the
        // get("4") refresh keeps "4" alive and "3" is evicted instead.
        let mut map = map(EvictionPolicy::LeastRecentlyUsed, 3);
        map.insert("4", 4);
        map.insert("3", 3);
        map.insert("2", 2);
        map.get(&"4");
        map.get(&"2");
        map.insert("5", 5);
        assert_eq!(map.len(), 3);
        assert!(map.contains(&"4"));
        assert!(map.contains(&"2"));
        assert!(!map.contains(&"3"));
    }

    #[test]
    fn least_recently_added_ignores_touches() {
        let mut map = map(EvictionPolicy::LeastRecentlyAdded, 3);
        map.insert("1", 1);
        map.insert("2", 2);
        map.insert("3", 3);
        // Neither re-insert nor get may refresh "1".
        map.insert("1", 10);
        map.get(&"1");
        map.insert("4", 4);
        assert!(!map.contains(&"1"));
        assert!(map.contains(&"2"));
        assert_eq!(map.keys_by_recency(), vec!["4", "3", "2"]);
    }

    #[test]
    fn insert_returns_previous_value() {
        let mut map = map(EvictionPolicy::LeastRecentlyModified, 2);
        assert_eq!(map.insert("a", 1), None);
        assert_eq!(map.insert("a", 2), Some(1));
        assert_eq!(map.peek(&"a"), Some(&2));
    }

    #[test]
    fn eviction_is_exactly_one_per_overflow() {
        let mut map = map(EvictionPolicy::LeastRecentlyUsed, 2);
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);
        assert_eq!(map.len(), 2);
        map.insert("d", 4);
        assert_eq!(map.len(), 2);
        map.check_invariants().unwrap();
    }

    #[test]
    fn zero_maximum_size_retains_nothing() {
        let mut map = map(EvictionPolicy::LeastRecentlyUsed, 0);
        assert_eq!(map.insert("a", 1), None);
        assert_eq!(map.len(), 0);
        assert_eq!(map.get(&"a"), None);
        map.check_invariants().unwrap();
    }

    #[test]
    fn peek_never_refreshes_order() {
        let mut map = map(EvictionPolicy::LeastRecentlyUsed, 2);
        map.insert("a", 1);
        map.insert("b", 2);
        map.peek(&"a");
        map.insert("c", 3);
        assert!(!map.contains(&"a"));
    }

    #[test]
    fn remove_and_clear() {
        let mut map = map(EvictionPolicy::LeastRecentlyModified, 3);
        map.insert("a", 1);
        map.insert("b", 2);
        assert_eq!(map.remove(&"a"), Some(1));
        assert_eq!(map.remove(&"a"), None);
        assert_eq!(map.len(), 1);
        map.clear();
        assert!(map.is_empty());
        map.check_invariants().unwrap();
    }

    #[test]
    fn pop_back_follows_recency_order() {
        let mut map = map(EvictionPolicy::LeastRecentlyUsed, 3);
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);
        map.get(&"a");
        assert_eq!(map.peek_back().map(|(k, _)| *k), Some("b"));
        assert_eq!(map.pop_back(), Some(("b", 2)));
        assert_eq!(map.pop_back(), Some(("c", 3)));
        assert_eq!(map.pop_back(), Some(("a", 1)));
        assert_eq!(map.pop_back(), None);
    }
}
