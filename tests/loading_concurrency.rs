// ==============================================
// LOADING CACHE CONCURRENCY TESTS (integration)
// ==============================================
//
// Behavior of the sharable read-through cache under real thread
// contention: load collapsing, absence propagation, panic recovery, and
// capacity enforcement on the sharded backend.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use chronocache::loading::{CacheConfig, ConcurrentLoadingCache, ReadThroughCache, SharedLoader};

// ==============================================
// Load Collapsing
// ==============================================

mod collapsing {
    use super::*;

    #[test]
    fn concurrent_misses_invoke_the_loader_once() {
        let calls = Arc::new(AtomicU64::new(0));
        let loader: SharedLoader<u64, u64> = {
            let calls = calls.clone();
            Arc::new(move |key| {
                calls.fetch_add(1, Ordering::SeqCst);
                // A slow load keeps every other thread parked on the slot.
                thread::sleep(Duration::from_millis(50));
                Some(key * 10)
            })
        };
        let cache = Arc::new(ConcurrentLoadingCache::new(
            CacheConfig::default().with_maximum_size(100),
            loader,
        ));

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache.get(&7)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(70));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.loads_in_flight(), 0);
    }

    #[test]
    fn distinct_keys_load_independently() {
        let calls = Arc::new(AtomicU64::new(0));
        let loader: SharedLoader<u64, u64> = {
            let calls = calls.clone();
            Arc::new(move |key| {
                calls.fetch_add(1, Ordering::SeqCst);
                Some(*key)
            })
        };
        let cache = Arc::new(ConcurrentLoadingCache::new(CacheConfig::default(), loader));

        let handles: Vec<_> = (0..8u64)
            .map(|key| {
                let cache = cache.clone();
                thread::spawn(move || cache.get(&key))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_some());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }
}

// ==============================================
// Failure Propagation
// ==============================================

mod failures {
    use super::*;

    #[test]
    fn absence_is_shared_with_waiters_and_never_cached() {
        let calls = Arc::new(AtomicU64::new(0));
        let loader: SharedLoader<u64, u64> = {
            let calls = calls.clone();
            Arc::new(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                None
            })
        };
        let cache = Arc::new(ConcurrentLoadingCache::new(CacheConfig::default(), loader));

        let threads = 4;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache.get(&1)
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), None);
        }
        // One collapsed load for the burst, and the key stays loadable.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(&1), None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!cache.contains(&1));
    }

    #[test]
    fn panicking_loader_leaves_the_key_retryable() {
        let poisoned = Arc::new(AtomicBool::new(true));
        let loader: SharedLoader<u64, u64> = {
            let poisoned = poisoned.clone();
            Arc::new(move |key| {
                if poisoned.swap(false, Ordering::SeqCst) {
                    panic!("transient source failure");
                }
                Some(key * 10)
            })
        };
        let cache = Arc::new(ConcurrentLoadingCache::new(
            CacheConfig::default().with_maximum_size(10),
            loader,
        ));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cache.get(&3)));
        assert!(result.is_err());
        assert_eq!(cache.loads_in_flight(), 0);
        // The failed load cached nothing and did not poison the key.
        assert_eq!(cache.get(&3), Some(30));
    }
}

// ==============================================
// Sharded Backend
// ==============================================

mod sharded {
    use super::*;

    #[test]
    fn capacity_holds_under_contention() {
        let loader: SharedLoader<u64, u64> = Arc::new(|key| Some(*key));
        let cache = Arc::new(ConcurrentLoadingCache::new(
            CacheConfig::default()
                .with_maximum_size(64)
                .with_high_concurrency(true),
            loader,
        ));

        let threads = 8;
        let handles: Vec<_> = (0..threads)
            .map(|thread_id| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..500u64 {
                        cache.get(&(thread_id * 1000 + i));
                        assert!(ReadThroughCache::len(cache.as_ref()) <= 64);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(ReadThroughCache::len(cache.as_ref()) <= 64);
        assert!(cache.stats().evictions > 0);
    }

    #[test]
    fn sharded_reads_stay_coherent() {
        let loader: SharedLoader<u64, u64> = Arc::new(|key| Some(key * 10));
        let cache = Arc::new(ConcurrentLoadingCache::new(
            CacheConfig::default()
                .with_maximum_size(1000)
                .with_high_concurrency(true),
            loader,
        ));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for key in 0..200u64 {
                        assert_eq!(cache.get(&key), Some(key * 10));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
