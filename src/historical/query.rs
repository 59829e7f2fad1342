//! Query facades over a historical cache.
//!
//! A query is a cheap per-caller value: it borrows the cache, carries its
//! own [`QuerySettings`], and never mutates anything another facade can
//! observe. All temporal navigation funnels through two internal walk
//! iterators, one per direction, which resolve navigation keys through the
//! cache, skip entries the element filter rejects, and suppress or
//! terminate on duplicates according to the settings.

use std::collections::VecDeque;
use std::hash::Hash;
use std::ops::Deref;

use crate::historical::cache::HistoricalCache;
use crate::historical::settings::QuerySettings;
use crate::historical::source::HistoricalSource;
use crate::historical::window::{DedupWindow, PushOutcome, INITIAL_WINDOW_ALLOCATION};
use crate::historical::Entry;
use crate::loading::ReadThroughCache;

/// Backward-looking query facade. See [`HistoricalCache::query`].
///
/// All operations resolve `key` to the nearest at-or-before entry first;
/// absence (before the first entry, exhausted walks, everything filtered
/// out) is `None`, never an error. Keys after the query key are only
/// reachable through [`with_future`](Self::with_future).
pub struct HistoricalQuery<'a, K, V, S, C> {
    cache: &'a HistoricalCache<K, V, S, C>,
    settings: QuerySettings<V>,
}

impl<'a, K, V, S, C> HistoricalQuery<'a, K, V, S, C>
where
    K: Ord + Hash + Clone,
    V: Clone,
    S: HistoricalSource<K, V>,
    C: ReadThroughCache<K, Entry<K, V>>,
{
    pub(crate) fn new(cache: &'a HistoricalCache<K, V, S, C>) -> Self {
        Self {
            cache,
            settings: QuerySettings::default(),
        }
    }

    // === Settings ===

    pub fn query_settings(&self) -> &QuerySettings<V> {
        &self.settings
    }

    /// Restricts results to values the filter accepts. Rejected entries
    /// are skipped by walks without consuming a shift step.
    pub fn with_element_filter(
        mut self,
        filter: impl Fn(&V) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.settings = self.settings.with_element_filter(filter);
        self
    }

    pub fn without_element_filter(mut self) -> Self {
        self.settings = self.settings.without_element_filter();
        self
    }

    /// Toggles suppression of adjacent duplicate entry keys in walks.
    /// Enabled by default.
    pub fn with_filter_duplicate_keys(mut self, filter_duplicate_keys: bool) -> Self {
        self.settings = self.settings.with_filter_duplicate_keys(filter_duplicate_keys);
        self
    }

    /// Copies element filter and duplicate-key filtering from `other`.
    pub fn copy_query_settings(mut self, other: &QuerySettings<V>) -> Self {
        self.settings = self.settings.copied_from(other);
        self
    }

    /// Restores the default settings.
    pub fn reset_query_settings(mut self) -> Self {
        self.settings = QuerySettings::default();
        self
    }

    /// Enables forward navigation, returning the future-capable facade.
    pub fn with_future(mut self) -> HistoricalQueryWithFuture<'a, K, V, S, C> {
        self.settings = self.settings.with_future_flag(true);
        HistoricalQueryWithFuture { base: self }
    }

    /// Keeps forward navigation disabled. This is the default; the call
    /// exists so call sites can state the choice explicitly.
    pub fn with_future_null(self) -> Self {
        self
    }

    // === Nearest at-or-before resolution ===

    /// The nearest at-or-before entry for `key` that passes the element
    /// filter, loaded and cached on miss.
    pub fn get_entry(&self, key: &K) -> Option<Entry<K, V>> {
        self.walk_back(key, false).next()
    }

    /// The value of [`get_entry`](Self::get_entry).
    pub fn get_value(&self, key: &K) -> Option<V> {
        self.get_entry(key).map(Entry::into_value)
    }

    /// The key of [`get_entry`](Self::get_entry).
    pub fn get_key(&self, key: &K) -> Option<K> {
        self.get_entry(key).map(Entry::into_key)
    }

    // === Single-shift backward navigation ===

    /// The entry `shift_back` qualifying steps before `key`; step 0 is the
    /// at-or-before entry, so `get_previous_entry(key, 0)` equals
    /// [`get_entry`](Self::get_entry). `None` once the walk is exhausted.
    pub fn get_previous_entry(&self, key: &K, shift_back: usize) -> Option<Entry<K, V>> {
        self.walk_back(key, self.clamps()).nth(shift_back)
    }

    pub fn get_previous_value(&self, key: &K, shift_back: usize) -> Option<V> {
        self.get_previous_entry(key, shift_back).map(Entry::into_value)
    }

    pub fn get_previous_key(&self, key: &K, shift_back: usize) -> Option<K> {
        self.get_previous_entry(key, shift_back).map(Entry::into_key)
    }

    // === Backward windows ===

    /// The inclusive ascending window from `shift_back` steps back up
    /// through `key`: at most `shift_back + 1` entries, fewer once the
    /// walk is exhausted. Restartable; repeated calls on an unmodified
    /// source return the same window.
    pub fn get_previous_entries(&self, key: &K, shift_back: usize) -> Vec<Entry<K, V>> {
        let capacity = shift_back.saturating_add(1);
        if self.settings.filter_duplicate_keys() {
            let mut window = DedupWindow::new(capacity);
            for entry in self.walk_back(key, false) {
                if matches!(window.push_front(entry), PushOutcome::Full) {
                    break;
                }
            }
            window.into_vec()
        } else {
            let mut window = VecDeque::with_capacity(capacity.min(INITIAL_WINDOW_ALLOCATION));
            for entry in self.walk_back(key, true) {
                if window.len() == capacity {
                    break;
                }
                window.push_front(entry);
            }
            Vec::from(window)
        }
    }

    pub fn get_previous_keys(&self, key: &K, shift_back: usize) -> Vec<K> {
        self.get_previous_entries(key, shift_back)
            .into_iter()
            .map(Entry::into_key)
            .collect()
    }

    pub fn get_previous_values(&self, key: &K, shift_back: usize) -> Vec<V> {
        self.get_previous_entries(key, shift_back)
            .into_iter()
            .map(Entry::into_value)
            .collect()
    }

    // === Range scans ===

    /// Lazily scans the inclusive range `[from, to]` in increasing key
    /// order, starting at the at-or-after key of `from` and stopping as
    /// soon as `to` is passed. Works over unbounded lazily-computed
    /// sources because no step looks past the bound.
    pub fn get_entries(&self, from: &K, to: &K) -> impl Iterator<Item = Entry<K, V>> + '_ {
        self.walk_forward(from, false, Some(to.clone()))
    }

    pub fn get_keys(&self, from: &K, to: &K) -> impl Iterator<Item = K> + '_ {
        self.get_entries(from, to).map(Entry::into_key)
    }

    pub fn get_values(&self, from: &K, to: &K) -> impl Iterator<Item = V> + '_ {
        self.get_entries(from, to).map(Entry::into_value)
    }

    // === Batch point lookups ===

    /// Resolves each key through [`get_entry`](Self::get_entry), lazily
    /// and in input order. Unresolvable keys yield `None` in place, so the
    /// output stays aligned with the input.
    pub fn get_entries_for<I>(&self, keys: I) -> impl Iterator<Item = Option<Entry<K, V>>> + '_
    where
        I: IntoIterator<Item = K>,
        I::IntoIter: 'static,
    {
        keys.into_iter().map(move |key| self.get_entry(&key))
    }

    /// The values of [`get_entries_for`](Self::get_entries_for).
    pub fn get_values_for<I>(&self, keys: I) -> impl Iterator<Item = Option<V>> + '_
    where
        I: IntoIterator<Item = K>,
        I::IntoIter: 'static,
    {
        self.get_entries_for(keys)
            .map(|entry| entry.map(Entry::into_value))
    }

    // === Value-comparison scans ===

    /// Walks backward from `key` through at most `max_shift_back` extra
    /// steps and returns the first entry whose value equals `value`.
    pub fn get_previous_entry_with_same_value(
        &self,
        key: &K,
        max_shift_back: usize,
        value: &V,
    ) -> Option<Entry<K, V>>
    where
        V: PartialEq,
    {
        self.walk_back(key, self.clamps())
            .take(max_shift_back.saturating_add(1))
            .find(|entry| entry.value() == value)
    }

    pub fn get_previous_key_with_same_value(
        &self,
        key: &K,
        max_shift_back: usize,
        value: &V,
    ) -> Option<K>
    where
        V: PartialEq,
    {
        self.get_previous_entry_with_same_value(key, max_shift_back, value)
            .map(Entry::into_key)
    }

    pub fn get_previous_value_with_same_value(
        &self,
        key: &K,
        max_shift_back: usize,
        value: &V,
    ) -> Option<V>
    where
        V: PartialEq,
    {
        self.get_previous_entry_with_same_value(key, max_shift_back, value)
            .map(Entry::into_value)
    }

    /// Walks backward from `key` through at most `max_shift_back` extra
    /// steps and returns the first entry whose value differs from `value`.
    pub fn get_previous_entry_with_different_value(
        &self,
        key: &K,
        max_shift_back: usize,
        value: &V,
    ) -> Option<Entry<K, V>>
    where
        V: PartialEq,
    {
        self.walk_back(key, self.clamps())
            .take(max_shift_back.saturating_add(1))
            .find(|entry| entry.value() != value)
    }

    pub fn get_previous_key_with_different_value(
        &self,
        key: &K,
        max_shift_back: usize,
        value: &V,
    ) -> Option<K>
    where
        V: PartialEq,
    {
        self.get_previous_entry_with_different_value(key, max_shift_back, value)
            .map(Entry::into_key)
    }

    pub fn get_previous_value_with_different_value(
        &self,
        key: &K,
        max_shift_back: usize,
        value: &V,
    ) -> Option<V>
    where
        V: PartialEq,
    {
        self.get_previous_entry_with_different_value(key, max_shift_back, value)
            .map(Entry::into_value)
    }

    /// Walks backward from `to` down to `from` (inclusive) and returns the
    /// first entry whose value equals `value`. Range-bounded walks treat a
    /// non-advancing source as exhausted regardless of duplicate-key
    /// filtering, so they always terminate.
    pub fn get_previous_entry_with_same_value_between(
        &self,
        from: &K,
        to: &K,
        value: &V,
    ) -> Option<Entry<K, V>>
    where
        V: PartialEq,
    {
        self.walk_back(to, false)
            .take_while(|entry| entry.key() >= from)
            .find(|entry| entry.value() == value)
    }

    pub fn get_previous_key_with_same_value_between(
        &self,
        from: &K,
        to: &K,
        value: &V,
    ) -> Option<K>
    where
        V: PartialEq,
    {
        self.get_previous_entry_with_same_value_between(from, to, value)
            .map(Entry::into_key)
    }

    pub fn get_previous_value_with_same_value_between(
        &self,
        from: &K,
        to: &K,
        value: &V,
    ) -> Option<V>
    where
        V: PartialEq,
    {
        self.get_previous_entry_with_same_value_between(from, to, value)
            .map(Entry::into_value)
    }

    /// Walks backward from `to` down to `from` (inclusive) and returns the
    /// first entry whose value differs from `value`.
    pub fn get_previous_entry_with_different_value_between(
        &self,
        from: &K,
        to: &K,
        value: &V,
    ) -> Option<Entry<K, V>>
    where
        V: PartialEq,
    {
        self.walk_back(to, false)
            .take_while(|entry| entry.key() >= from)
            .find(|entry| entry.value() != value)
    }

    pub fn get_previous_key_with_different_value_between(
        &self,
        from: &K,
        to: &K,
        value: &V,
    ) -> Option<K>
    where
        V: PartialEq,
    {
        self.get_previous_entry_with_different_value_between(from, to, value)
            .map(Entry::into_key)
    }

    pub fn get_previous_value_with_different_value_between(
        &self,
        from: &K,
        to: &K,
        value: &V,
    ) -> Option<V>
    where
        V: PartialEq,
    {
        self.get_previous_entry_with_different_value_between(from, to, value)
            .map(Entry::into_value)
    }

    // === Walk internals ===

    /// Whether a non-advancing predecessor/successor repeats its entry
    /// instead of exhausting the walk. Only shift-counted walks over
    /// unfiltered key sequences clamp; everything else must terminate.
    fn clamps(&self) -> bool {
        !self.settings.filter_duplicate_keys()
    }

    fn walk_back(&self, key: &K, clamp: bool) -> BackwardEntries<'_, K, V, S, C> {
        BackwardEntries {
            query: self,
            cursor: self.cache.source().floor_key(key),
            last_key: None,
            clamp,
        }
    }

    fn walk_forward(
        &self,
        key: &K,
        clamp: bool,
        bound: Option<K>,
    ) -> ForwardEntries<'_, K, V, S, C> {
        ForwardEntries {
            query: self,
            cursor: self.cache.source().ceiling_key(key),
            last_key: None,
            clamp,
            bound,
        }
    }

    /// Resolves one walk step: the entry at `navigation`, or `None` when
    /// the entry is unloadable, a suppressed duplicate, or rejected by the
    /// element filter.
    fn qualify(&self, navigation: &K, last_key: &Option<K>) -> Option<Entry<K, V>> {
        let entry = self.cache.entry_at(navigation)?;
        if self.settings.filter_duplicate_keys() && last_key.as_ref() == Some(entry.key()) {
            return None;
        }
        if !self.settings.accepts(entry.value()) {
            return None;
        }
        Some(entry)
    }
}

impl<K, V, S, C> Clone for HistoricalQuery<'_, K, V, S, C> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache,
            settings: self.settings.clone(),
        }
    }
}

impl<K, V, S, C> std::fmt::Debug for HistoricalQuery<'_, K, V, S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoricalQuery")
            .field("settings", &self.settings)
            .finish()
    }
}

/// Forward-capable query facade, created by
/// [`HistoricalQuery::with_future`]. Dereferences to the base facade, so
/// every backward operation stays available.
pub struct HistoricalQueryWithFuture<'a, K, V, S, C> {
    base: HistoricalQuery<'a, K, V, S, C>,
}

impl<'a, K, V, S, C> HistoricalQueryWithFuture<'a, K, V, S, C>
where
    K: Ord + Hash + Clone,
    V: Clone,
    S: HistoricalSource<K, V>,
    C: ReadThroughCache<K, Entry<K, V>>,
{
    /// Already future-enabled; returns itself.
    pub fn with_future(self) -> Self {
        self
    }

    /// Disabling forward navigation on a future-enabled facade is a usage
    /// error: the caller holds the wrong type for that intent.
    pub fn with_future_null(self) -> HistoricalQuery<'a, K, V, S, C> {
        panic!("with_future_null() on a future-enabled query; build the query without with_future() instead");
    }

    /// The entry `shift_forward` qualifying steps after `key`; step 0 is
    /// the at-or-after entry. `None` once the walk is exhausted.
    pub fn get_next_entry(&self, key: &K, shift_forward: usize) -> Option<Entry<K, V>> {
        self.base.walk_forward(key, self.base.clamps(), None).nth(shift_forward)
    }

    pub fn get_next_value(&self, key: &K, shift_forward: usize) -> Option<V> {
        self.get_next_entry(key, shift_forward).map(Entry::into_value)
    }

    pub fn get_next_key(&self, key: &K, shift_forward: usize) -> Option<K> {
        self.get_next_entry(key, shift_forward).map(Entry::into_key)
    }

    /// The inclusive ascending window from `key` through `shift_forward`
    /// steps ahead: at most `shift_forward + 1` entries, fewer once the
    /// walk is exhausted.
    pub fn get_next_entries(&self, key: &K, shift_forward: usize) -> Vec<Entry<K, V>> {
        let capacity = shift_forward.saturating_add(1);
        if self.base.settings.filter_duplicate_keys() {
            let mut window = DedupWindow::new(capacity);
            for entry in self.base.walk_forward(key, false, None) {
                if matches!(window.push_back(entry), PushOutcome::Full) {
                    break;
                }
            }
            window.into_vec()
        } else {
            let mut window = VecDeque::with_capacity(capacity.min(INITIAL_WINDOW_ALLOCATION));
            for entry in self.base.walk_forward(key, true, None) {
                if window.len() == capacity {
                    break;
                }
                window.push_back(entry);
            }
            Vec::from(window)
        }
    }

    pub fn get_next_keys(&self, key: &K, shift_forward: usize) -> Vec<K> {
        self.get_next_entries(key, shift_forward)
            .into_iter()
            .map(Entry::into_key)
            .collect()
    }

    pub fn get_next_values(&self, key: &K, shift_forward: usize) -> Vec<V> {
        self.get_next_entries(key, shift_forward)
            .into_iter()
            .map(Entry::into_value)
            .collect()
    }
}

impl<'a, K, V, S, C> Deref for HistoricalQueryWithFuture<'a, K, V, S, C> {
    type Target = HistoricalQuery<'a, K, V, S, C>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl<K, V, S, C> Clone for HistoricalQueryWithFuture<'_, K, V, S, C> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
        }
    }
}

impl<K, V, S, C> std::fmt::Debug for HistoricalQueryWithFuture<'_, K, V, S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoricalQueryWithFuture")
            .field("settings", &self.base.settings)
            .finish()
    }
}

/// Backward walk over qualifying entries, newest first.
struct BackwardEntries<'q, K, V, S, C> {
    query: &'q HistoricalQuery<'q, K, V, S, C>,
    cursor: Option<K>,
    last_key: Option<K>,
    clamp: bool,
}

impl<K, V, S, C> Iterator for BackwardEntries<'_, K, V, S, C>
where
    K: Ord + Hash + Clone,
    V: Clone,
    S: HistoricalSource<K, V>,
    C: ReadThroughCache<K, Entry<K, V>>,
{
    type Item = Entry<K, V>;

    fn next(&mut self) -> Option<Entry<K, V>> {
        loop {
            let navigation = self.cursor.take()?;
            let advanced = match self.query.cache.source().key_before(&navigation) {
                Some(previous) if previous < navigation => {
                    self.cursor = Some(previous);
                    true
                },
                Some(_) if self.clamp => {
                    // Clamped at the boundary: keep repeating this entry.
                    self.cursor = Some(navigation.clone());
                    false
                },
                _ => false,
            };
            match self.query.qualify(&navigation, &self.last_key) {
                Some(entry) => {
                    self.last_key = Some(entry.key().clone());
                    return Some(entry);
                },
                None if advanced => continue,
                None => {
                    // No progress is possible past a clamped, rejected step.
                    self.cursor = None;
                    return None;
                },
            }
        }
    }
}

/// Forward walk over qualifying entries, oldest first, optionally bounded
/// by an inclusive upper navigation key.
struct ForwardEntries<'q, K, V, S, C> {
    query: &'q HistoricalQuery<'q, K, V, S, C>,
    cursor: Option<K>,
    last_key: Option<K>,
    clamp: bool,
    bound: Option<K>,
}

impl<K, V, S, C> Iterator for ForwardEntries<'_, K, V, S, C>
where
    K: Ord + Hash + Clone,
    V: Clone,
    S: HistoricalSource<K, V>,
    C: ReadThroughCache<K, Entry<K, V>>,
{
    type Item = Entry<K, V>;

    fn next(&mut self) -> Option<Entry<K, V>> {
        loop {
            let navigation = self.cursor.take()?;
            if let Some(bound) = &self.bound {
                if navigation > *bound {
                    return None;
                }
            }
            let advanced = match self.query.cache.source().key_after(&navigation) {
                Some(next) if next > navigation => {
                    self.cursor = Some(next);
                    true
                },
                Some(_) if self.clamp => {
                    self.cursor = Some(navigation.clone());
                    false
                },
                _ => false,
            };
            match self.query.qualify(&navigation, &self.last_key) {
                Some(entry) => {
                    self.last_key = Some(entry.key().clone());
                    return Some(entry);
                },
                None if advanced => continue,
                None => {
                    self.cursor = None;
                    return None;
                },
            }
        }
    }
}
