//! Single-thread-confined loading cache.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::eviction::EvictionMap;
use crate::loading::{CacheConfig, CacheCounters, CacheStats, Loader};

enum LocalBackend<K, V> {
    Disabled,
    Unbounded(FxHashMap<K, V>),
    Bounded(EvictionMap<K, V>),
}

/// A read-through cache for exclusive single-threaded use.
///
/// Takes `&mut self` and carries no synchronization whatsoever; the owner
/// guarantees exclusive access and gets maximal throughput in return. For
/// sharing across threads use
/// [`ConcurrentLoadingCache`](crate::loading::ConcurrentLoadingCache).
///
/// # Example
///
/// ```
/// use chronocache::loading::{CacheConfig, LoadingCache};
///
/// let mut cache = LoadingCache::new(
///     CacheConfig::default().with_maximum_size(2),
///     Box::new(|key: &u64| Some(key * 10)),
/// );
/// assert_eq!(cache.get(&3), Some(30)); // loaded
/// assert_eq!(cache.get(&3), Some(30)); // cached
/// assert_eq!(cache.stats().loads, 1);
/// ```
pub struct LoadingCache<K, V> {
    backend: LocalBackend<K, V>,
    loader: Loader<K, V>,
    counters: CacheCounters,
}

impl<K, V> LoadingCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache with the backend selected from `config`.
    ///
    /// `high_concurrency` is meaningless without sharing and is ignored
    /// here; the bounded backend is used instead.
    pub fn new(config: CacheConfig, loader: Loader<K, V>) -> Self {
        let backend = match config.maximum_size {
            None => LocalBackend::Unbounded(FxHashMap::default()),
            Some(0) => LocalBackend::Disabled,
            Some(maximum_size) => {
                LocalBackend::Bounded(EvictionMap::new(config.eviction_policy, maximum_size))
            },
        };
        Self {
            backend,
            loader,
            counters: CacheCounters::default(),
        }
    }

    /// Returns the cached value for `key`, loading it on miss.
    ///
    /// Absence from the loader is returned as `None` and never cached.
    pub fn get(&mut self, key: &K) -> Option<V> {
        match &mut self.backend {
            LocalBackend::Disabled => {},
            LocalBackend::Unbounded(map) => {
                if let Some(value) = map.get(key) {
                    self.counters.inc_hit();
                    return Some(value.clone());
                }
            },
            LocalBackend::Bounded(map) => {
                if let Some(value) = map.get(key) {
                    self.counters.inc_hit();
                    return Some(value.clone());
                }
            },
        }
        self.counters.inc_miss();
        let loaded = self.run_loader(key);
        if let Some(value) = &loaded {
            self.store(key.clone(), value.clone());
        }
        loaded
    }

    /// Returns the cached value without loading or touching recency order.
    pub fn peek(&self, key: &K) -> Option<V> {
        match &self.backend {
            LocalBackend::Disabled => None,
            LocalBackend::Unbounded(map) => map.get(key).cloned(),
            LocalBackend::Bounded(map) => map.peek(key).cloned(),
        }
    }

    /// Stores a value directly, bypassing the loader (cache warm-up).
    pub fn put(&mut self, key: K, value: V) {
        self.counters.inc_put();
        self.store(key, value);
    }

    /// Removes a cached value by key.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = match &mut self.backend {
            LocalBackend::Disabled => None,
            LocalBackend::Unbounded(map) => map.remove(key),
            LocalBackend::Bounded(map) => map.remove(key),
        };
        if removed.is_some() {
            self.counters.inc_remove();
        }
        removed
    }

    /// Whether the key is currently cached. Never loads.
    pub fn contains(&self, key: &K) -> bool {
        match &self.backend {
            LocalBackend::Disabled => false,
            LocalBackend::Unbounded(map) => map.contains_key(key),
            LocalBackend::Bounded(map) => map.contains(key),
        }
    }

    /// Number of currently cached entries.
    pub fn len(&self) -> usize {
        match &self.backend {
            LocalBackend::Disabled => 0,
            LocalBackend::Unbounded(map) => map.len(),
            LocalBackend::Bounded(map) => map.len(),
        }
    }

    /// Whether the cache currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all cached entries.
    pub fn clear(&mut self) {
        match &mut self.backend {
            LocalBackend::Disabled => {},
            LocalBackend::Unbounded(map) => map.clear(),
            LocalBackend::Bounded(map) => map.clear(),
        }
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    fn run_loader(&self, key: &K) -> Option<V> {
        self.counters.inc_load();
        let loaded = (self.loader)(key);
        if loaded.is_none() {
            self.counters.inc_failed_load();
        }
        loaded
    }

    fn store(&mut self, key: K, value: V) {
        match &mut self.backend {
            LocalBackend::Disabled => {},
            LocalBackend::Unbounded(map) => {
                map.insert(key, value);
            },
            LocalBackend::Bounded(map) => {
                let evicts = map.len() == map.maximum_size() && !map.contains(&key);
                map.insert(key, value);
                if evicts {
                    self.counters.inc_eviction();
                }
            },
        }
    }
}

impl<K, V> std::fmt::Debug for LoadingCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            LocalBackend::Disabled => "disabled",
            LocalBackend::Unbounded(_) => "unbounded",
            LocalBackend::Bounded(_) => "bounded",
        };
        f.debug_struct("LoadingCache")
            .field("backend", &backend)
            .field("len", &self.len())
            .finish()
    }
}
