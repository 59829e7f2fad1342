//! Read-through loading caches.
//!
//! A loading cache owns a backend store selected once from a
//! [`CacheConfig`] and a loader function invoked on every miss. Backend
//! selection:
//!
//! 1. `maximum_size` unset: unbounded map, never evicts.
//! 2. `maximum_size == 0`: disabled, every `get` invokes the loader and
//!    nothing is retained.
//! 3. `high_concurrency`: sharded striped store with per-shard eviction;
//!    amortized O(1) under contention, eviction order only approximately
//!    recency-accurate.
//! 4. otherwise: a single [`EvictionMap`](crate::eviction::EvictionMap)
//!    under the configured policy.
//!
//! Two cache types realize the two operating regimes:
//!
//! - [`LoadingCache`]: single-thread-confined, `&mut self`, no internal
//!   synchronization at all. Concurrent access is ruled out by the type
//!   system rather than left undefined.
//! - [`ConcurrentLoadingCache`]: `&self`, sharable, every structural
//!   mutation inside one critical section (or one shard's), with per-key
//!   collapsing of concurrent misses.
//!
//! A loader returning `None` signals absence: the result is propagated to
//! the caller (and to every collapsed waiter) and never cached, so the next
//! call retries the loader.

mod concurrent;
mod local;
mod pending;

pub use concurrent::ConcurrentLoadingCache;
pub use local::LoadingCache;

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::eviction::EvictionPolicy;

/// Loader for a single-thread-confined cache.
pub type Loader<K, V> = Box<dyn Fn(&K) -> Option<V>>;

/// Loader for a sharable cache; invoked from whichever thread misses first.
pub type SharedLoader<K, V> = Arc<dyn Fn(&K) -> Option<V> + Send + Sync>;

/// Configuration for loading-cache construction.
///
/// An explicit value threaded through constructors; there is no process-wide
/// default selector.
///
/// # Example
///
/// ```
/// use chronocache::eviction::EvictionPolicy;
/// use chronocache::loading::CacheConfig;
///
/// let config = CacheConfig::default()
///     .with_maximum_size(1000)
///     .with_eviction_policy(EvictionPolicy::LeastRecentlyUsed);
/// assert_eq!(config.maximum_size, Some(1000));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Maximum number of retained entries. `None` means unbounded (the
    /// default); `Some(0)` disables retention entirely.
    pub maximum_size: Option<usize>,
    /// Prefer the sharded backend for contended workloads. Only meaningful
    /// for [`ConcurrentLoadingCache`] with a bounded size.
    pub high_concurrency: bool,
    /// Recency policy for the bounded backends.
    pub eviction_policy: EvictionPolicy,
}

impl CacheConfig {
    /// Creates the default configuration: unbounded, not high-concurrency,
    /// least-recently-modified eviction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the cache to `maximum_size` entries.
    pub fn with_maximum_size(mut self, maximum_size: usize) -> Self {
        self.maximum_size = Some(maximum_size);
        self
    }

    /// Removes any size bound.
    pub fn with_unbounded(mut self) -> Self {
        self.maximum_size = None;
        self
    }

    /// Selects the sharded backend (bounded concurrent caches only).
    pub fn with_high_concurrency(mut self, high_concurrency: bool) -> Self {
        self.high_concurrency = high_concurrency;
        self
    }

    /// Selects the eviction policy for bounded backends.
    pub fn with_eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = policy;
        self
    }
}

/// Snapshot of cache-level counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub loads: u64,
    /// Loads that returned absence; such results are never cached.
    pub failed_loads: u64,
    pub evictions: u64,
    pub puts: u64,
    pub removes: u64,
}

/// Atomic counters shared by both cache types.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    failed_loads: AtomicU64,
    evictions: AtomicU64,
    puts: AtomicU64,
    removes: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            failed_loads: self.failed_loads.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn inc_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_failed_load(&self) {
        self.failed_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Uniform `&self` view over both loading-cache types.
///
/// Lets callers such as
/// [`HistoricalCache`](crate::historical::HistoricalCache) stay generic over
/// the operating regime. The single-thread-confined cache participates via
/// `RefCell<LoadingCache<K, V>>`, which remains `!Sync` and therefore still
/// cannot leak across threads.
pub trait ReadThroughCache<K, V> {
    /// Returns the cached value or invokes the loader on miss.
    fn get(&self, key: &K) -> Option<V>;

    /// Returns the cached value without loading or touching recency order.
    fn peek(&self, key: &K) -> Option<V>;

    /// Stores a value directly, e.g. for cache warm-up.
    fn put(&self, key: K, value: V);

    /// Removes a cached value by key.
    fn remove(&self, key: &K) -> Option<V>;

    /// Whether the key is currently cached. Never loads.
    fn contains(&self, key: &K) -> bool;

    /// Number of currently cached entries.
    fn len(&self) -> usize;

    /// Whether the cache currently holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all cached entries.
    fn clear(&self);

    /// Snapshot of the cache counters.
    fn stats(&self) -> CacheStats;
}

impl<K, V> ReadThroughCache<K, V> for RefCell<LoadingCache<K, V>>
where
    K: Eq + std::hash::Hash + Clone,
    V: Clone,
{
    fn get(&self, key: &K) -> Option<V> {
        self.borrow_mut().get(key)
    }

    fn peek(&self, key: &K) -> Option<V> {
        self.borrow().peek(key)
    }

    fn put(&self, key: K, value: V) {
        self.borrow_mut().put(key, value);
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.borrow_mut().remove(key)
    }

    fn contains(&self, key: &K) -> bool {
        self.borrow().contains(key)
    }

    fn len(&self) -> usize {
        self.borrow().len()
    }

    fn clear(&self) {
        self.borrow_mut().clear();
    }

    fn stats(&self) -> CacheStats {
        self.borrow().stats()
    }
}
