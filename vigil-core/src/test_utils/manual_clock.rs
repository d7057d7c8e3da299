//! ManualClock: a clock that only moves when told to.

use crate::clock::Clock;
use std::sync::atomic::{AtomicU64, Ordering};

/// A settable clock for deterministic schedule tests.
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Start at `now_ms`.
    pub fn new(now_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(now_ms),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    /// Move forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
