//! Manual-reset event used to sequence the controller, the solver workers
//! and the file worker.
//!
//! Once set, an event stays signalled until explicitly reset, so waiters
//! arriving after the signal do not block. This is the minimal condvar
//! encoding of the original design's event objects.

use std::sync::{Condvar, Mutex};

#[derive(Debug, Default)]
pub(crate) struct Event {
    signalled: Mutex<bool>,
    condvar: Condvar,
}

impl Event {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Signals the event, waking all current and future waiters.
    pub(crate) fn set(&self) {
        let mut signalled = self.signalled.lock().unwrap_or_else(|e| e.into_inner());
        *signalled = true;
        drop(signalled);
        self.condvar.notify_all();
    }

    /// Clears the signal. Only called while no waiter is active.
    pub(crate) fn reset(&self) {
        let mut signalled = self.signalled.lock().unwrap_or_else(|e| e.into_inner());
        *signalled = false;
    }

    /// Returns whether the event is currently signalled.
    pub(crate) fn is_set(&self) -> bool {
        *self.signalled.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Blocks until the event is signalled.
    pub(crate) fn wait(&self) {
        let mut signalled = self.signalled.lock().unwrap_or_else(|e| e.into_inner());
        while !*signalled {
            signalled = self
                .condvar
                .wait(signalled)
                .unwrap_or_else(|e| e.into_inner());
        }
    }
}
