//! Sharable read-through loading cache.

use std::hash::{BuildHasher, Hash};

use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::eviction::EvictionMap;
use crate::loading::pending::{Join, PendingLoads};
use crate::loading::{CacheConfig, CacheCounters, CacheStats, ReadThroughCache, SharedLoader};

enum SharedBackend<K, V> {
    Disabled,
    Unbounded(RwLock<FxHashMap<K, V>>),
    Bounded(Mutex<EvictionMap<K, V>>),
    Sharded(ShardedMap<K, V>),
}

/// Striped store: one bounded eviction map per shard, per-shard capacities
/// summing exactly to the configured maximum. Recency is tracked per shard
/// only, so global eviction order is approximate; in exchange, operations
/// on different shards never contend.
struct ShardedMap<K, V> {
    shards: Vec<Mutex<EvictionMap<K, V>>>,
    hasher: FxBuildHasher,
}

impl<K, V> ShardedMap<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new(config: &CacheConfig, maximum_size: usize) -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1);
        let shard_count = parallelism.min(maximum_size).max(1);
        let mut shards = Vec::with_capacity(shard_count);
        for index in 0..shard_count {
            // Distribute the capacity remainder over the first shards.
            let shard_size =
                maximum_size / shard_count + usize::from(index < maximum_size % shard_count);
            shards.push(Mutex::new(EvictionMap::new(
                config.eviction_policy,
                shard_size,
            )));
        }
        Self {
            shards,
            hasher: FxBuildHasher,
        }
    }

    fn shard(&self, key: &K) -> &Mutex<EvictionMap<K, V>> {
        let index = (self.hasher.hash_one(key) as usize) % self.shards.len();
        &self.shards[index]
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }
}

/// A read-through cache sharable across threads.
///
/// Every structural mutation runs inside one critical section per cache (or
/// per shard for the high-concurrency backend), and concurrent misses on
/// the same key collapse onto a single in-flight load: the loader runs once
/// and every waiter receives the same result. A loader panic releases the
/// waiters and leaves the key retryable.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use chronocache::loading::{CacheConfig, ConcurrentLoadingCache};
///
/// let cache = Arc::new(ConcurrentLoadingCache::new(
///     CacheConfig::default().with_maximum_size(100),
///     Arc::new(|key: &u64| Some(key * 10)),
/// ));
/// assert_eq!(cache.get(&4), Some(40));
/// ```
pub struct ConcurrentLoadingCache<K, V> {
    backend: SharedBackend<K, V>,
    loader: SharedLoader<K, V>,
    pending: PendingLoads<K, V>,
    counters: CacheCounters,
}

impl<K, V> ConcurrentLoadingCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache with the backend selected from `config`.
    pub fn new(config: CacheConfig, loader: SharedLoader<K, V>) -> Self {
        let backend = match config.maximum_size {
            None => SharedBackend::Unbounded(RwLock::new(FxHashMap::default())),
            Some(0) => SharedBackend::Disabled,
            Some(maximum_size) if config.high_concurrency => {
                SharedBackend::Sharded(ShardedMap::new(&config, maximum_size))
            },
            Some(maximum_size) => SharedBackend::Bounded(Mutex::new(EvictionMap::new(
                config.eviction_policy,
                maximum_size,
            ))),
        };
        Self {
            backend,
            loader,
            pending: PendingLoads::new(),
            counters: CacheCounters::default(),
        }
    }

    /// Returns the cached value for `key`, loading it on miss.
    ///
    /// Concurrent callers missing the same key share one load; the loader
    /// runs outside any store lock. Absence from the loader is propagated
    /// to every waiter and never cached.
    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(value) = self.lookup(key) {
            self.counters.inc_hit();
            return Some(value);
        }
        self.counters.inc_miss();
        if matches!(self.backend, SharedBackend::Disabled) {
            // Nothing is retained, so there is nothing to collapse onto.
            return self.run_loader(key);
        }
        loop {
            match self.pending.join_or_lead(key) {
                Join::Ready(result) => return result,
                Join::Retry => {
                    if let Some(value) = self.lookup(key) {
                        self.counters.inc_hit();
                        return Some(value);
                    }
                },
                Join::Lead(guard) => {
                    // A racing leader may have stored the value between our
                    // miss and the slot registration.
                    if let Some(value) = self.lookup(key) {
                        guard.complete(Some(value.clone()));
                        self.counters.inc_hit();
                        return Some(value);
                    }
                    let loaded = self.run_loader(key);
                    if let Some(value) = &loaded {
                        self.store(key.clone(), value.clone());
                    }
                    guard.complete(loaded.clone());
                    return loaded;
                },
            }
        }
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Number of loads currently in flight. Diagnostics only.
    pub fn loads_in_flight(&self) -> usize {
        self.pending.in_flight()
    }

    fn lookup(&self, key: &K) -> Option<V> {
        match &self.backend {
            SharedBackend::Disabled => None,
            SharedBackend::Unbounded(map) => map.read().get(key).cloned(),
            SharedBackend::Bounded(map) => map.lock().get(key).cloned(),
            SharedBackend::Sharded(sharded) => sharded.shard(key).lock().get(key).cloned(),
        }
    }

    fn run_loader(&self, key: &K) -> Option<V> {
        self.counters.inc_load();
        let loaded = (self.loader)(key);
        if loaded.is_none() {
            self.counters.inc_failed_load();
        }
        loaded
    }

    fn store(&self, key: K, value: V) {
        match &self.backend {
            SharedBackend::Disabled => {},
            SharedBackend::Unbounded(map) => {
                map.write().insert(key, value);
            },
            SharedBackend::Bounded(map) => {
                let mut map = map.lock();
                let evicts = map.len() == map.maximum_size() && !map.contains(&key);
                map.insert(key, value);
                if evicts {
                    self.counters.inc_eviction();
                }
            },
            SharedBackend::Sharded(sharded) => {
                let mut shard = sharded.shard(&key).lock();
                let evicts = shard.len() == shard.maximum_size() && !shard.contains(&key);
                shard.insert(key, value);
                if evicts {
                    self.counters.inc_eviction();
                }
            },
        }
    }
}

impl<K, V> ReadThroughCache<K, V> for ConcurrentLoadingCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn get(&self, key: &K) -> Option<V> {
        ConcurrentLoadingCache::get(self, key)
    }

    fn peek(&self, key: &K) -> Option<V> {
        match &self.backend {
            SharedBackend::Disabled => None,
            SharedBackend::Unbounded(map) => map.read().get(key).cloned(),
            SharedBackend::Bounded(map) => map.lock().peek(key).cloned(),
            SharedBackend::Sharded(sharded) => sharded.shard(key).lock().peek(key).cloned(),
        }
    }

    fn put(&self, key: K, value: V) {
        self.counters.inc_put();
        self.store(key, value);
    }

    fn remove(&self, key: &K) -> Option<V> {
        let removed = match &self.backend {
            SharedBackend::Disabled => None,
            SharedBackend::Unbounded(map) => map.write().remove(key),
            SharedBackend::Bounded(map) => map.lock().remove(key),
            SharedBackend::Sharded(sharded) => sharded.shard(key).lock().remove(key),
        };
        if removed.is_some() {
            self.counters.inc_remove();
        }
        removed
    }

    fn contains(&self, key: &K) -> bool {
        match &self.backend {
            SharedBackend::Disabled => false,
            SharedBackend::Unbounded(map) => map.read().contains_key(key),
            SharedBackend::Bounded(map) => map.lock().contains(key),
            SharedBackend::Sharded(sharded) => sharded.shard(key).lock().contains(key),
        }
    }

    fn len(&self) -> usize {
        match &self.backend {
            SharedBackend::Disabled => 0,
            SharedBackend::Unbounded(map) => map.read().len(),
            SharedBackend::Bounded(map) => map.lock().len(),
            SharedBackend::Sharded(sharded) => sharded.len(),
        }
    }

    fn clear(&self) {
        match &self.backend {
            SharedBackend::Disabled => {},
            SharedBackend::Unbounded(map) => map.write().clear(),
            SharedBackend::Bounded(map) => map.lock().clear(),
            SharedBackend::Sharded(sharded) => {
                for shard in &sharded.shards {
                    shard.lock().clear();
                }
            },
        }
    }

    fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}

impl<K, V> std::fmt::Debug for ConcurrentLoadingCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            SharedBackend::Disabled => "disabled",
            SharedBackend::Unbounded(_) => "unbounded",
            SharedBackend::Bounded(_) => "bounded",
            SharedBackend::Sharded(_) => "sharded",
        };
        f.debug_struct("ConcurrentLoadingCache")
            .field("backend", &backend)
            .field("len", &ReadThroughCache::len(self))
            .finish()
    }
}
