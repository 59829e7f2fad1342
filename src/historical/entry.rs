//! Immutable key/value pair returned by historical queries.

/// An immutable (key, value) pair from a historical source.
///
/// The key is the entry's own key as reported by
/// [`HistoricalSource::extract_key`](crate::historical::HistoricalSource::extract_key),
/// which may differ from the navigation key a query was asked about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<K, V> {
    key: K,
    value: V,
}

impl<K, V> Entry<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry, returning its key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Consumes the entry, returning its value.
    pub fn into_value(self) -> V {
        self.value
    }

    /// Consumes the entry, returning both halves.
    pub fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_and_destructuring() {
        let entry = Entry::new(3u64, "three");
        assert_eq!(*entry.key(), 3);
        assert_eq!(*entry.value(), "three");
        assert_eq!(entry.clone().into_key(), 3);
        assert_eq!(entry.clone().into_value(), "three");
        assert_eq!(entry.into_pair(), (3, "three"));
    }
}
