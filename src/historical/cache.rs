//! The historical cache: a read-through cache over a historical source.

use std::cell::RefCell;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::historical::query::HistoricalQuery;
use crate::historical::source::HistoricalSource;
use crate::historical::Entry;
use crate::loading::{
    CacheConfig, CacheStats, ConcurrentLoadingCache, Loader, LoadingCache, ReadThroughCache,
    SharedLoader,
};

/// A cache of [`Entry`] values keyed by navigation key, fed by a
/// [`HistoricalSource`].
///
/// The cache itself only memoizes exact-key loads; all temporal semantics
/// (nearest at-or-before resolution, backward and forward walks, duplicate
/// and element filtering) live in the [`query`](Self::query) facade. Keys a
/// source cannot resolve are never cached, so a source that fills in later
/// is picked up by subsequent queries.
///
/// Two constructors select the operating regime: [`new`](Self::new) builds
/// over a [`ConcurrentLoadingCache`] and is sharable across threads;
/// [`single_threaded`](Self::single_threaded) builds over a thread-confined
/// [`LoadingCache`] with zero synchronization.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
///
/// use chronocache::historical::HistoricalCache;
/// use chronocache::loading::CacheConfig;
///
/// let source = BTreeMap::from([(10u64, "a"), (20, "b"), (30, "c")]);
/// let cache = HistoricalCache::new(source, CacheConfig::default());
/// let query = cache.query();
/// assert_eq!(query.get_value(&25), Some("b"));
/// assert_eq!(query.get_key(&25), Some(20));
/// ```
pub struct HistoricalCache<K, V, S, C = ConcurrentLoadingCache<K, Entry<K, V>>> {
    source: Arc<S>,
    cache: C,
    _regime: PhantomData<fn(K) -> V>,
}

impl<K, V, S> HistoricalCache<K, V, S>
where
    K: Ord + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: HistoricalSource<K, V> + Send + Sync + 'static,
{
    /// Creates a sharable historical cache over `source`.
    pub fn new(source: S, config: CacheConfig) -> Self {
        let source = Arc::new(source);
        let loader: SharedLoader<K, Entry<K, V>> = Arc::new(entry_loader(source.clone()));
        Self {
            source,
            cache: ConcurrentLoadingCache::new(config, loader),
            _regime: PhantomData,
        }
    }
}

impl<K, V, S> HistoricalCache<K, V, S, RefCell<LoadingCache<K, Entry<K, V>>>>
where
    K: Ord + Hash + Clone + 'static,
    V: Clone + 'static,
    S: HistoricalSource<K, V> + 'static,
{
    /// Creates a thread-confined historical cache over `source`.
    pub fn single_threaded(source: S, config: CacheConfig) -> Self {
        let source = Arc::new(source);
        let loader: Loader<K, Entry<K, V>> = Box::new(entry_loader(source.clone()));
        Self {
            source,
            cache: RefCell::new(LoadingCache::new(config, loader)),
            _regime: PhantomData,
        }
    }
}

fn entry_loader<K, V, S>(source: Arc<S>) -> impl Fn(&K) -> Option<Entry<K, V>>
where
    K: Clone,
    S: HistoricalSource<K, V>,
{
    move |key: &K| {
        let value = source.load(key)?;
        let entry_key = source.extract_key(key, &value);
        Some(Entry::new(entry_key, value))
    }
}

impl<K, V, S, C> HistoricalCache<K, V, S, C>
where
    K: Ord + Hash + Clone,
    V: Clone,
    S: HistoricalSource<K, V>,
    C: ReadThroughCache<K, Entry<K, V>>,
{
    /// Opens a query facade with default settings.
    pub fn query(&self) -> HistoricalQuery<'_, K, V, S, C> {
        HistoricalQuery::new(self)
    }

    /// The underlying source.
    pub fn source(&self) -> &S {
        self.source.as_ref()
    }

    /// Resolves the at-or-before entry for `key` directly against the
    /// source, bypassing the cache entirely. Neither reads nor writes
    /// cached state.
    pub fn compute_entry(&self, key: &K) -> Option<Entry<K, V>> {
        let mut navigation = self.source.floor_key(key)?;
        loop {
            if let Some(value) = self.source.load(&navigation) {
                let entry_key = self.source.extract_key(&navigation, &value);
                return Some(Entry::new(entry_key, value));
            }
            let previous = self.source.key_before(&navigation)?;
            if previous >= navigation {
                return None;
            }
            navigation = previous;
        }
    }

    /// The key of [`compute_entry`](Self::compute_entry).
    pub fn compute_key(&self, key: &K) -> Option<K> {
        self.compute_entry(key).map(Entry::into_key)
    }

    /// The value of [`compute_entry`](Self::compute_entry).
    pub fn compute_value(&self, key: &K) -> Option<V> {
        self.compute_entry(key).map(Entry::into_value)
    }

    // === Raw store view ===

    /// The cached entry at navigation key `key`, loading on miss.
    pub(crate) fn entry_at(&self, key: &K) -> Option<Entry<K, V>> {
        self.cache.get(key)
    }

    /// The cached entry without loading or touching recency order.
    pub fn peek_entry(&self, key: &K) -> Option<Entry<K, V>> {
        self.cache.peek(key)
    }

    /// Warms the cache with an entry at navigation key `key`.
    pub fn put_entry(&self, key: K, entry: Entry<K, V>) {
        self.cache.put(key, entry);
    }

    /// Drops the cached entry at navigation key `key`.
    pub fn remove_entry(&self, key: &K) -> Option<Entry<K, V>> {
        self.cache.remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.cache.contains(key)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Snapshot of the underlying cache counters.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl<K, V, S, C> std::fmt::Debug for HistoricalCache<K, V, S, C>
where
    K: Ord + Hash + Clone,
    V: Clone,
    S: HistoricalSource<K, V>,
    C: ReadThroughCache<K, Entry<K, V>>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoricalCache")
            .field("len", &self.len())
            .finish()
    }
}
