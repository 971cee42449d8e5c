//! One-shot claim guard.

use std::sync::atomic::{AtomicBool, Ordering};

/// A flag that can be claimed exactly once until released.
///
/// `claim` is a compare-and-set: of any number of concurrent callers, exactly one sees `true`.
#[derive(Debug, Default)]
pub struct OneShotGuard {
    claimed: AtomicBool,
}

impl OneShotGuard {
    pub const fn new() -> Self {
        Self {
            claimed: AtomicBool::new(false),
        }
    }

    /// Returns `true` for the single caller that flipped the guard.
    pub fn claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.claimed.store(false, Ordering::Release);
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}
