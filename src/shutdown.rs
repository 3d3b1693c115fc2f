use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Cooperative stop flag shared by every worker and the controller.
///
/// Workers check it at the top of their loops; the controller can block on
/// it. Requesting a stop more than once has no further effect.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    requested: Mutex<bool>,
    cond: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        let mut requested = self.inner.requested.lock();
        if !*requested {
            *requested = true;
            self.inner.cond.notify_all();
        }
    }

    pub fn is_requested(&self) -> bool {
        *self.inner.requested.lock()
    }

    /// Returns true if a stop was requested before `timeout` ran out.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut requested = self.inner.requested.lock();
        if !*requested {
            self.inner.cond.wait_for(&mut requested, timeout);
        }
        *requested
    }
}
