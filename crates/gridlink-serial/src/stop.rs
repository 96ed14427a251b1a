//! Set-once cooperative stop flag.
//!
//! The only cancellation primitive in the bridge. Transitions
//! false→true exactly once per process; there is no reset. Observers
//! either poll [`StopSignal::is_set`] or block on
//! [`StopSignal::wait_timeout`], which returns early the moment the
//! flag is set.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

#[derive(Clone)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

struct StopInner {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StopInner {
                stopped: Mutex::new(false),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Latch the flag. The first call wakes all waiters; later calls
    /// are no-ops.
    pub fn set(&self) {
        let mut stopped = self.inner.stopped.lock();
        if !*stopped {
            *stopped = true;
            self.inner.condvar.notify_all();
        }
    }

    pub fn is_set(&self) -> bool {
        *self.inner.stopped.lock()
    }

    /// Wait until the flag is set or `timeout` elapses, whichever
    /// comes first. Returns the flag's state on return.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut stopped = self.inner.stopped.lock();
        if *stopped {
            return true;
        }
        self.inner.condvar.wait_for(&mut stopped, timeout);
        *stopped
    }
}
