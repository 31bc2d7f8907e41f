//! Time source abstraction so the event loop can run against a manual clock.
//!
//! The loop needs two views of time: a monotonic [`Instant`] for the break
//! session's one-second ticks and deadline waits, and wall-clock UTC for the
//! solar scheduler. [`RealTimeSource`] reads both from the system.
//! [`ManualTimeSource`] only moves when told to, which keeps tests
//! deterministic.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub trait TimeSource: Send + Sync {
    /// Monotonic time for deadlines.
    fn now(&self) -> Instant;

    /// Wall-clock time for solar calculations.
    fn utc_now(&self) -> DateTime<Utc>;

    /// Block for up to `duration`. Manual sources advance instead.
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that moves only through [`ManualTimeSource::advance`].
pub struct ManualTimeSource {
    start_instant: Instant,
    start_utc: DateTime<Utc>,
    elapsed: Mutex<Duration>,
}

impl ManualTimeSource {
    pub fn new(start_utc: DateTime<Utc>) -> Self {
        Self {
            start_instant: Instant::now(),
            start_utc,
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    fn elapsed(&self) -> Duration {
        match self.elapsed.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = match self.elapsed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard += by;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Instant {
        self.start_instant + self.elapsed()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.elapsed()).unwrap_or(chrono::Duration::zero());
        self.start_utc + elapsed
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
