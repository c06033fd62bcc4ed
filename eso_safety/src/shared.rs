//! Concurrent access to one supervisor.
//!
//! The supervisory thread and other tasks share the supervisor through
//! [`SharedSupervisor`]. Contexts that must never block (interrupt-like
//! callbacks, signal handlers) use a [`StopHandle`] instead: triggering it
//! is a single atomic store, and the supervisor performs the full forced
//! stop at its next cycle or mutating call. Until then the pending latch
//! already refuses every energize request.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eso_common::clock::Clock;
use eso_common::hal::SafetyHal;
use eso_common::safety::{FaultCode, SafetyError, SafetySystemStatus};
use parking_lot::{Mutex, MutexGuard};

use crate::supervisor::SafetySupervisor;

/// Lock-free pending stop request.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    pending: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a forced stop. Never blocks.
    #[inline]
    pub fn trigger(&self) {
        self.pending.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Consume the request.
    #[inline]
    pub(crate) fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

/// Supervisor shared between threads.
pub struct SharedSupervisor<H: SafetyHal, C: Clock> {
    inner: Arc<Mutex<SafetySupervisor<H, C>>>,
    stop: StopHandle,
}

impl<H: SafetyHal, C: Clock> Clone for SharedSupervisor<H, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            stop: self.stop.clone(),
        }
    }
}

impl<H: SafetyHal, C: Clock> SharedSupervisor<H, C> {
    pub fn new(supervisor: SafetySupervisor<H, C>) -> Self {
        let stop = supervisor.stop_handle();
        Self {
            inner: Arc::new(Mutex::new(supervisor)),
            stop,
        }
    }

    /// Exclusive access for any other operation.
    pub fn lock(&self) -> MutexGuard<'_, SafetySupervisor<H, C>> {
        self.inner.lock()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Latch a stop, then take the lock and stop synchronously.
    ///
    /// The latch is set first so that energize requests racing for the
    /// lock are refused.
    pub fn force_stop(&self, reason: &str) -> Result<(), SafetyError> {
        self.stop.trigger();
        self.inner.lock().force_stop(reason)
    }

    /// Latch a stop without waiting for the lock.
    pub fn request_stop(&self) {
        self.stop.trigger();
    }

    /// Run one supervisory pass.
    pub fn cycle(&self) -> Result<FaultCode, SafetyError> {
        self.inner.lock().cycle()
    }

    pub fn system_status(&self) -> SafetySystemStatus {
        self.inner.lock().system_status()
    }
}
