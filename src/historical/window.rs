//! Bounded duplicate-filtering window over historical entries.

use std::collections::VecDeque;

use crate::error::InvariantError;
use crate::historical::Entry;

/// Cap on eager buffer allocation. A window's logical capacity may be far
/// larger than what a walk ever fills (callers pass shift counts straight
/// through), so buffers start small and grow on demand.
pub(crate) const INITIAL_WINDOW_ALLOCATION: usize = 64;

/// Result of pushing an entry into a [`DedupWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The entry was appended at the pushed end.
    Added,
    /// The entry's key equals the boundary entry's key; suppressed,
    /// consuming no capacity.
    Duplicate,
    /// The window is at capacity; the entry was rejected.
    Full,
}

/// A bounded ordered buffer that suppresses adjacent duplicate keys.
///
/// Entries can be appended at either end, so the window serves both walk
/// directions: a backward walk builds it oldest-last via [`push_front`],
/// a forward walk oldest-first via [`push_back`]. Either way the surviving
/// entries keep their original relative order and no two adjacent entries
/// share a key.
///
/// [`push_front`]: Self::push_front
/// [`push_back`]: Self::push_back
///
/// # Example
///
/// ```
/// use chronocache::historical::{DedupWindow, Entry, PushOutcome};
///
/// let mut window = DedupWindow::new(4);
/// for key in [0u64, 0, 1, 2, 2] {
///     window.push_back(Entry::new(key, key));
/// }
/// let keys: Vec<u64> = window.iter().map(|entry| *entry.key()).collect();
/// assert_eq!(keys, [0, 1, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct DedupWindow<K, V> {
    entries: VecDeque<Entry<K, V>>,
    capacity: usize,
}

impl<K, V> DedupWindow<K, V>
where
    K: PartialEq,
{
    /// Creates an empty window holding at most `capacity` entries.
    ///
    /// `capacity` is a logical bound, not an allocation: the buffer grows
    /// as entries arrive, so an arbitrarily large capacity is valid.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(INITIAL_WINDOW_ALLOCATION)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn front(&self) -> Option<&Entry<K, V>> {
        self.entries.front()
    }

    pub fn back(&self) -> Option<&Entry<K, V>> {
        self.entries.back()
    }

    /// Appends at the back unless the back entry already carries this key.
    ///
    /// The duplicate check runs before the capacity check: a boundary
    /// duplicate is suppressed even when the window is full.
    pub fn push_back(&mut self, entry: Entry<K, V>) -> PushOutcome {
        if let Some(back) = self.entries.back() {
            if back.key() == entry.key() {
                return PushOutcome::Duplicate;
            }
        }
        if self.entries.len() == self.capacity {
            return PushOutcome::Full;
        }
        self.entries.push_back(entry);
        PushOutcome::Added
    }

    /// Appends at the front unless the front entry already carries this key.
    pub fn push_front(&mut self, entry: Entry<K, V>) -> PushOutcome {
        if let Some(front) = self.entries.front() {
            if front.key() == entry.key() {
                return PushOutcome::Duplicate;
            }
        }
        if self.entries.len() == self.capacity {
            return PushOutcome::Full;
        }
        self.entries.push_front(entry);
        PushOutcome::Added
    }

    /// Pushes every entry at the back, stopping at capacity. Returns the
    /// number of entries actually added.
    pub fn extend_back<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = Entry<K, V>>,
    {
        let mut added = 0;
        for entry in entries {
            match self.push_back(entry) {
                PushOutcome::Added => added += 1,
                PushOutcome::Duplicate => {},
                PushOutcome::Full => break,
            }
        }
        added
    }

    /// Inserts a block at the front, preserving the block's own order, with
    /// duplicate suppression inside the block and at the junction with the
    /// existing front. Returns the number of entries actually added.
    ///
    /// On overflow the entries farthest from the junction are the ones
    /// dropped.
    pub fn extend_front<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = Entry<K, V>>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut added = 0;
        for entry in entries.into_iter().rev() {
            match self.push_front(entry) {
                PushOutcome::Added => added += 1,
                PushOutcome::Duplicate => {},
                PushOutcome::Full => break,
            }
        }
        added
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry<K, V>> {
        self.entries.iter()
    }

    /// Consumes the window into a front-to-back `Vec`.
    pub fn into_vec(self) -> Vec<Entry<K, V>> {
        Vec::from(self.entries)
    }

    /// Verifies the window's structural invariants. Test support.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.entries.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "window holds {} entries over capacity {}",
                self.entries.len(),
                self.capacity
            )));
        }
        for (index, pair) in self
            .entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .enumerate()
        {
            if pair.0.key() == pair.1.key() {
                return Err(InvariantError::new(format!(
                    "adjacent duplicate key at positions {} and {}",
                    index,
                    index + 1
                )));
            }
        }
        Ok(())
    }
}
