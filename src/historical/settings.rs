//! Per-query configuration.

use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether a loaded value participates in query results.
pub type ElementFilter<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// Settings carried by one query facade.
///
/// An immutable value: every `with_*` call returns an adjusted copy, so two
/// facades over the same cache never alias each other's settings.
pub struct QuerySettings<V> {
    element_filter: Option<ElementFilter<V>>,
    filter_duplicate_keys: bool,
    future: bool,
}

impl<V> QuerySettings<V> {
    /// Whether `value` participates in results. `true` when no element
    /// filter is installed.
    pub fn accepts(&self, value: &V) -> bool {
        match &self.element_filter {
            Some(filter) => filter(value),
            None => true,
        }
    }

    pub fn element_filter(&self) -> Option<&ElementFilter<V>> {
        self.element_filter.as_ref()
    }

    pub fn filter_duplicate_keys(&self) -> bool {
        self.filter_duplicate_keys
    }

    /// Whether keys after the query key may be visited.
    pub fn future_enabled(&self) -> bool {
        self.future
    }

    pub fn with_element_filter(
        mut self,
        filter: impl Fn(&V) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.element_filter = Some(Arc::new(filter));
        self
    }

    pub fn without_element_filter(mut self) -> Self {
        self.element_filter = None;
        self
    }

    pub fn with_filter_duplicate_keys(mut self, filter_duplicate_keys: bool) -> Self {
        self.filter_duplicate_keys = filter_duplicate_keys;
        self
    }

    pub(crate) fn with_future_flag(mut self, future: bool) -> Self {
        self.future = future;
        self
    }

    /// Copies the element filter and duplicate-key filtering from `other`.
    /// The future flag is not copied; it is encoded in the facade type.
    pub(crate) fn copied_from(mut self, other: &QuerySettings<V>) -> Self {
        self.element_filter = other.element_filter.clone();
        self.filter_duplicate_keys = other.filter_duplicate_keys;
        self
    }
}

impl<V> Default for QuerySettings<V> {
    /// No element filter, duplicate-key filtering on, future mode off.
    fn default() -> Self {
        Self {
            element_filter: None,
            filter_duplicate_keys: true,
            future: false,
        }
    }
}

impl<V> Clone for QuerySettings<V> {
    fn clone(&self) -> Self {
        Self {
            element_filter: self.element_filter.clone(),
            filter_duplicate_keys: self.filter_duplicate_keys,
            future: self.future,
        }
    }
}

impl<V> fmt::Debug for QuerySettings<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySettings")
            .field("element_filter", &self.element_filter.is_some())
            .field("filter_duplicate_keys", &self.filter_duplicate_keys)
            .field("future", &self.future)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings: QuerySettings<u64> = QuerySettings::default();
        assert!(settings.filter_duplicate_keys());
        assert!(!settings.future_enabled());
        assert!(settings.accepts(&0));
    }

    #[test]
    fn with_calls_produce_adjusted_copies() {
        let base: QuerySettings<u64> = QuerySettings::default();
        let filtered = base.clone().with_element_filter(|value| *value > 10);
        assert!(base.accepts(&5));
        assert!(!filtered.accepts(&5));
        assert!(filtered.accepts(&11));
        let raw = filtered.clone().with_filter_duplicate_keys(false);
        assert!(filtered.filter_duplicate_keys());
        assert!(!raw.filter_duplicate_keys());
    }

    #[test]
    fn copied_from_excludes_the_future_flag() {
        let donor: QuerySettings<u64> = QuerySettings::default()
            .with_filter_duplicate_keys(false)
            .with_future_flag(true);
        let copied = QuerySettings::default().copied_from(&donor);
        assert!(!copied.filter_duplicate_keys());
        assert!(!copied.future_enabled());
    }
}
