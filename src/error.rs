//! Error types for the chronocache library.
//!
//! Absence of data is never an error in this crate: queries past the edge
//! of a data source return `None`. The types here cover the remaining,
//! genuinely exceptional cases:
//!
//! - [`InvariantError`]: returned by debug-only `check_invariants` methods
//!   when an internal data-structure invariant is violated.

use std::fmt;

/// Error returned when an internal data-structure invariant is violated.
///
/// Produced by debug-only `check_invariants` methods (e.g.
/// [`EvictionMap::check_invariants`](crate::eviction::EvictionMap::check_invariants)).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("list length mismatch");
        assert_eq!(err.to_string(), "list length mismatch");
    }

    #[test]
    fn invariant_clone_and_eq() {
        let a = InvariantError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a.message(), "x");
    }

    #[test]
    fn invariant_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<InvariantError>();
    }
}
