use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Timed wait between retries that an operator can interrupt.
pub trait Pause: Send + Sync {
    /// Waits up to `duration`. Returns `true` when the wait was cancelled.
    fn pause(&self, duration: Duration) -> bool;

    /// Whether new work should be started at all.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Process-wide shutdown flag backed by a condition variable.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    triggered: Mutex<bool>,
    wake: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels every current and future wait.
    pub fn trigger(&self) {
        let mut triggered = self.triggered.lock();
        *triggered = true;
        self.wake.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.triggered.lock()
    }
}

impl Pause for ShutdownSignal {
    fn pause(&self, duration: Duration) -> bool {
        let mut triggered = self.triggered.lock();
        // A cool-down past the clock's range waits for the trigger alone.
        let Some(deadline) = Instant::now().checked_add(duration) else {
            while !*triggered {
                self.wake.wait(&mut triggered);
            }
            return true;
        };
        while !*triggered {
            if self.wake.wait_until(&mut triggered, deadline).timed_out() {
                break;
            }
        }
        *triggered
    }

    fn is_cancelled(&self) -> bool {
        self.is_triggered()
    }
}
