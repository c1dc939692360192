//! Wall-clock source for rotation decisions.

use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Source of the current time
///
/// Every policy evaluation takes exactly one reading, so tests can pin the
/// clock with [`FixedClock`].
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
