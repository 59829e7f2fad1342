//! Per-key collapsing of concurrent in-flight loads.
//!
//! The first caller to miss a key installs an in-flight slot and runs the
//! loader; every concurrent caller for the same key blocks on that slot and
//! receives the same result. The slot is removed on completion, so a key is
//! always retryable afterwards: an absent result or a panicking loader
//! never poisons the key.

use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

enum SlotState<V> {
    InFlight,
    /// The leader finished; `None` means the loader reported absence.
    Done(Option<V>),
    /// The leader unwound without completing (loader panic).
    Abandoned,
}

struct LoadSlot<V> {
    state: Mutex<SlotState<V>>,
    ready: Condvar,
}

impl<V> LoadSlot<V> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::InFlight),
            ready: Condvar::new(),
        }
    }
}

/// Outcome of [`PendingLoads::join_or_lead`].
pub(crate) enum Join<'a, K: Eq + Hash + Clone, V> {
    /// Another caller already computed the result; use it as-is.
    Ready(Option<V>),
    /// This caller leads the load; it must call [`InFlightGuard::complete`].
    Lead(InFlightGuard<'a, K, V>),
    /// The previous leader abandoned the slot; start over.
    Retry,
}

/// Table of in-flight loads, one slot per missing key.
pub(crate) struct PendingLoads<K, V> {
    slots: Mutex<FxHashMap<K, Arc<LoadSlot<V>>>>,
}

impl<K, V> PendingLoads<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(FxHashMap::default()),
        }
    }

    /// Joins an existing in-flight load for `key` or becomes its leader.
    ///
    /// Joining blocks until the leader completes or abandons the slot. The
    /// slot registration itself holds locks only briefly; the loader runs
    /// outside every lock.
    pub(crate) fn join_or_lead(&self, key: &K) -> Join<'_, K, V> {
        let slot = {
            let mut slots = self.slots.lock();
            match slots.get(key) {
                Some(slot) => slot.clone(),
                None => {
                    let slot = Arc::new(LoadSlot::new());
                    slots.insert(key.clone(), slot.clone());
                    return Join::Lead(InFlightGuard {
                        pending: self,
                        key: key.clone(),
                        slot,
                        completed: false,
                    });
                },
            }
        };
        let mut state = slot.state.lock();
        while matches!(*state, SlotState::InFlight) {
            slot.ready.wait(&mut state);
        }
        match &*state {
            SlotState::Done(result) => Join::Ready(result.clone()),
            SlotState::Abandoned => Join::Retry,
            SlotState::InFlight => unreachable!("woken while still in flight"),
        }
    }

    /// Number of keys currently in flight. Diagnostics and tests only.
    pub(crate) fn in_flight(&self) -> usize {
        self.slots.lock().len()
    }

    fn finish(&self, key: &K, slot: &Arc<LoadSlot<V>>, state: SlotState<V>) {
        {
            let mut slot_state = slot.state.lock();
            *slot_state = state;
        }
        slot.ready.notify_all();
        self.slots.lock().remove(key);
    }
}

/// Leadership over one in-flight load.
///
/// Dropping the guard without [`complete`](Self::complete) marks the slot
/// abandoned, waking all waiters so they can retry. This is the unwind path
/// when a loader panics.
pub(crate) struct InFlightGuard<'a, K: Eq + Hash + Clone, V> {
    pending: &'a PendingLoads<K, V>,
    key: K,
    slot: Arc<LoadSlot<V>>,
    completed: bool,
}

impl<K, V> InFlightGuard<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Publishes the load result to all waiters and retires the slot.
    pub(crate) fn complete(mut self, result: Option<V>) {
        self.completed = true;
        self.pending
            .finish(&self.key, &self.slot, SlotState::Done(result));
    }
}

impl<K, V> Drop for InFlightGuard<'_, K, V>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        if !self.completed {
            {
                let mut slot_state = self.slot.state.lock();
                *slot_state = SlotState::Abandoned;
            }
            self.slot.ready.notify_all();
            self.pending.slots.lock().remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leader_completes_and_clears_slot() {
        let pending: PendingLoads<u64, u64> = PendingLoads::new();
        match pending.join_or_lead(&1) {
            Join::Lead(guard) => guard.complete(Some(42)),
            _ => panic!("expected to lead"),
        }
        assert_eq!(pending.in_flight(), 0);
        // The slot is gone, so the next caller leads again.
        assert!(matches!(pending.join_or_lead(&1), Join::Lead(_)));
    }

    #[test]
    fn dropped_guard_abandons_slot() {
        let pending: PendingLoads<u64, u64> = PendingLoads::new();
        match pending.join_or_lead(&1) {
            Join::Lead(guard) => drop(guard),
            _ => panic!("expected to lead"),
        }
        assert_eq!(pending.in_flight(), 0);
        assert!(matches!(pending.join_or_lead(&1), Join::Lead(_)));
    }

    #[test]
    fn waiter_receives_leader_result() {
        let pending: Arc<PendingLoads<u64, u64>> = Arc::new(PendingLoads::new());
        let guard = match pending.join_or_lead(&1) {
            Join::Lead(guard) => guard,
            _ => panic!("expected to lead"),
        };
        let waiter = {
            let pending = pending.clone();
            std::thread::spawn(move || match pending.join_or_lead(&1) {
                Join::Ready(result) => result,
                // The waiter only leads if it arrives after completion, in
                // which case leading again is the correct behavior.
                Join::Lead(guard) => {
                    guard.complete(Some(7));
                    Some(7)
                },
                Join::Retry => panic!("slot was not abandoned"),
            })
        };
        // Give the waiter time to block on the slot, then publish.
        std::thread::sleep(std::time::Duration::from_millis(20));
        guard.complete(Some(7));
        assert_eq!(waiter.join().unwrap(), Some(7));
    }
}
