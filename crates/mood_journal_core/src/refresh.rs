//! crates/mood_journal_core/src/refresh.rs
//!
//! The version counter presentation views watch to know when to re-fetch.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing; every successful write bumps it.
#[derive(Debug, Default)]
pub struct RefreshToken(AtomicU64);

impl RefreshToken {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Increments and returns the new value.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bumps_are_monotonic() {
        let token = RefreshToken::default();
        assert_eq!(token.current(), 0);
        assert_eq!(token.bump(), 1);
        assert_eq!(token.bump(), 2);
        assert_eq!(token.current(), 2);
    }
}
