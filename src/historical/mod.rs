//! Temporally-indexed caching over an ordered key/value source.
//!
//! A [`HistoricalCache`] memoizes loads from a [`HistoricalSource`], an
//! ordered series navigated by strict predecessor/successor steps. The
//! [`query`](HistoricalCache::query) facade resolves any key to its nearest
//! at-or-before entry and walks the series in either direction:
//!
//! | Operation family | Direction | Bound |
//! |------------------|-----------|-------|
//! | `get_entry` / `get_value` / `get_key` | at-or-before | exact resolution |
//! | `get_previous_*` | backward | shift count |
//! | `get_previous_*_with_same_value`, `..._with_different_value` | backward | shift count or `[from, to]` range |
//! | `get_entries` / `get_keys` / `get_values` | forward | inclusive range, lazy |
//! | `get_next_*` (via [`HistoricalQuery::with_future`]) | forward | shift count |
//!
//! Each facade carries its own [`QuerySettings`]: an optional element
//! filter (rejected entries are skipped without consuming shift steps) and
//! duplicate-key filtering (adjacent duplicate entry keys suppressed,
//! enabled by default). Results are [`Entry`] pairs; absence is `None` in
//! every case, never an error.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use chronocache::historical::HistoricalCache;
//! use chronocache::loading::CacheConfig;
//!
//! let bars = BTreeMap::from([(10u64, 1.0f64), (20, 2.0), (30, 3.0)]);
//! let cache = HistoricalCache::new(bars, CacheConfig::default().with_maximum_size(100));
//!
//! let query = cache.query();
//! assert_eq!(query.get_value(&25), Some(2.0));
//! assert_eq!(query.get_previous_value(&25, 1), Some(1.0));
//! assert_eq!(query.get_previous_values(&30, 2), vec![1.0, 2.0, 3.0]);
//!
//! let future = cache.query().with_future();
//! assert_eq!(future.get_next_value(&25, 0), Some(3.0));
//! ```

mod cache;
mod entry;
mod query;
mod settings;
mod source;
mod window;

pub use cache::HistoricalCache;
pub use entry::Entry;
pub use query::{HistoricalQuery, HistoricalQueryWithFuture};
pub use settings::{ElementFilter, QuerySettings};
pub use source::HistoricalSource;
pub use window::{DedupWindow, PushOutcome};
