//! Clock abstraction for session timestamps
//!
//! Every timestamp the driver writes flows through a [`Clock`] so that tests
//! can pin or advance time deterministically instead of racing the wall
//! clock.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Source of the current instant used for session timestamps and gc cutoffs
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time; the default for production drivers
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually controlled clock
///
/// Primarily for tests: freeze time to exercise touch-only writes whose
/// timestamp does not change, or advance it to expire sessions on demand.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock pinned to the given instant
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
        }
    }

    /// Move the clock forward by `secs` seconds
    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.write();
        *now += chrono::Duration::seconds(secs);
    }

    /// Pin the clock to a new instant
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}
