//! chronocache: temporally-indexed read-through caching.
//!
//! A [`loading::LoadingCache`] transparently computes and retains values
//! under a configurable bounded-eviction backend, and a
//! [`historical::HistoricalCache`] layers point lookups, backward/forward
//! shift walks, range scans and value scans on top of it, driven by
//! externally supplied key navigation over the true data source.

pub mod error;
pub mod eviction;
pub mod historical;
pub mod loading;

pub mod prelude;
