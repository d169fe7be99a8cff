//! One-shot latch used to hold back empty batches.
//!
//! A gate starts closed and is opened exactly once. Opening is permanent: a
//! batch is single-use, so there is nothing to re-arm. Waiters block on a
//! condition variable until the flag flips.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
pub struct ReadyGate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl ReadyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate and wake every waiter. Later calls are no-ops.
    pub fn open(&self) {
        let mut open = self.open.lock();
        if !*open {
            *open = true;
            self.cond.notify_all();
        }
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }

    /// Block until the gate opens.
    pub fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
    }

    /// Block until the gate opens or `timeout` elapses.
    ///
    /// Returns `true` if the gate is open.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut open = self.open.lock();
        if !*open {
            // Spurious wakeups are absorbed by the predicate loop.
            let _ = self.cond.wait_while_for(&mut open, |open| !*open, timeout);
        }
        *open
    }
}
