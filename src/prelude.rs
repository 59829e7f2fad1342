//! Convenience re-exports of the crate's main types.
//!
//! ```
//! use chronocache::prelude::*;
//!
//! let cache: LoadingCache<u64, u64> = LoadingCache::new(
//!     CacheConfig::default().with_maximum_size(10),
//!     Box::new(|key| Some(key + 1)),
//! );
//! ```

pub use crate::error::InvariantError;
pub use crate::eviction::{EvictionMap, EvictionPolicy};
pub use crate::historical::{
    DedupWindow, Entry, HistoricalCache, HistoricalQuery, HistoricalQueryWithFuture,
    HistoricalSource, QuerySettings,
};
pub use crate::loading::{
    CacheConfig, CacheStats, ConcurrentLoadingCache, LoadingCache, ReadThroughCache,
};
