//! Single-flight control lock.
//!
//! A compare-and-set flag with an RAII permit. Acquisition fails
//! immediately when the lock is held; there is no queueing. The permit
//! releases on drop, so the lock is freed on every exit path including
//! unwinds.

use std::sync::atomic::{AtomicBool, Ordering};

/// Mutual exclusion for control operations. One instance per control
/// service; the flag starts free and is never persisted.
#[derive(Debug, Default)]
pub struct ControlGuard {
    busy: AtomicBool,
}

impl ControlGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to take the lock. Returns `None` immediately when a
    /// control operation is already in flight.
    pub fn try_acquire(&self) -> Option<ControlPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| ControlPermit { guard: self })
    }

    /// Whether a control operation currently holds the lock.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Held for the duration of one control operation.
#[derive(Debug)]
pub struct ControlPermit<'a> {
    guard: &'a ControlGuard,
}

impl Drop for ControlPermit<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
