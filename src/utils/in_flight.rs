//! Single-flight guard for user actions
//!
//! Each action owns one [`InFlight`] flag. A second submission while the
//! first request is outstanding is rejected rather than queued.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct InFlight {
    active: AtomicBool,
}

impl InFlight {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
        }
    }

    /// Claim the flag; `None` if a request is already in flight
    #[must_use]
    pub fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { flag: &self.active })
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Releases the flag when dropped
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_is_rejected_until_release() {
        let flag = InFlight::new();

        let guard = flag.try_begin().expect("first claim succeeds");
        assert!(flag.is_active());
        assert!(flag.try_begin().is_none());

        drop(guard);
        assert!(!flag.is_active());
        assert!(flag.try_begin().is_some());
    }
}
