//! Per-worker concurrency limiter.
//!
//! A worker takes a permit before dequeuing, so the shared queue drains only
//! as fast as that worker frees slots.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub(super) struct InnerPermits {
    limit: usize,
    in_use: Mutex<usize>,
    freed: Condvar,
}

/// Held while one task runs; dropping it frees the slot.
#[derive(Debug)]
pub(super) struct Permit<'a> {
    permits: &'a InnerPermits,
}

impl InnerPermits {
    pub(super) fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            in_use: Mutex::new(0),
            freed: Condvar::new(),
        }
    }

    /// Blocks until a slot is free.
    pub(super) fn acquire(&self) -> Permit<'_> {
        let mut in_use = self.lock();
        while *in_use >= self.limit {
            in_use = self
                .freed
                .wait(in_use)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *in_use += 1;
        Permit { permits: self }
    }

    /// Number of slots currently held.
    pub(super) fn in_use(&self) -> usize {
        *self.lock()
    }

    /// Free slots (limit - in_use).
    #[cfg(test)]
    pub(super) fn available(&self) -> usize {
        self.limit.saturating_sub(self.in_use())
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.in_use.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let mut in_use = self.permits.lock();
        *in_use = in_use.saturating_sub(1);
        drop(in_use);
        self.permits.freed.notify_one();
    }
}
