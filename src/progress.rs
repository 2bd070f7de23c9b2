//! Shared progress and cancellation token for long-running crypto calls
//!
//! A `Progress` is handed to exactly one running `transform`/`encrypt`/`decrypt`
//! call, which is its only writer. Any number of clones may be held by observers
//! on other threads to poll the counters or request cancellation.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::{CancellationReason, CryptoError, Result};

const NOT_CANCELLED: u8 = 0;
const USER_REQUESTED: u8 = 1;
const LOW_MEMORY: u8 = 2;

#[derive(Default)]
struct Inner {
    total: AtomicU64,
    completed: AtomicU64,
    // Flag and reason live in one atomic so they flip together.
    cancellation: AtomicU8,
}

/// Unit-based progress with a one-shot cancellation flag
#[derive(Clone, Default)]
pub struct Progress {
    inner: Arc<Inner>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_unit_count(&self) -> u64 {
        self.inner.total.load(Ordering::Acquire)
    }

    pub fn completed_unit_count(&self) -> u64 {
        self.inner.completed.load(Ordering::Acquire)
    }

    /// Completed fraction in `[0.0, 1.0]`; zero while the total is unknown.
    pub fn fraction_completed(&self) -> f64 {
        let total = self.total_unit_count();
        if total == 0 {
            return 0.0;
        }
        self.completed_unit_count() as f64 / total as f64
    }

    pub(crate) fn set_total_unit_count(&self, total: u64) {
        self.inner.total.store(total, Ordering::Release);
    }

    /// Advance the completed count. Never moves backwards and never exceeds the total.
    pub(crate) fn set_completed_unit_count(&self, completed: u64) {
        let capped = completed.min(self.total_unit_count());
        self.inner.completed.fetch_max(capped, Ordering::AcqRel);
    }

    /// Request cancellation.
    ///
    /// Returns `true` if this call cancelled the operation, `false` if it had already
    /// been cancelled (the first reason wins and is never replaced).
    pub fn cancel(&self, reason: CancellationReason) -> bool {
        let code = match reason {
            CancellationReason::UserRequested => USER_REQUESTED,
            CancellationReason::LowMemory => LOW_MEMORY,
        };
        self.inner
            .cancellation
            .compare_exchange(NOT_CANCELLED, code, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_reason().is_some()
    }

    pub fn cancellation_reason(&self) -> Option<CancellationReason> {
        match self.inner.cancellation.load(Ordering::Acquire) {
            USER_REQUESTED => Some(CancellationReason::UserRequested),
            LOW_MEMORY => Some(CancellationReason::LowMemory),
            _ => None,
        }
    }

    /// Fail with `Cancelled` if cancellation has been requested.
    pub fn check_cancelled(&self) -> Result<()> {
        match self.cancellation_reason() {
            Some(reason) => Err(CryptoError::Cancelled(reason)),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("completed", &self.completed_unit_count())
            .field("total", &self.total_unit_count())
            .field("cancellation_reason", &self.cancellation_reason())
            .finish()
    }
}
