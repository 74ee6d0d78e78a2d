//! Clock sources for frame and audit timestamps

use chrono::{DateTime, Duration, Utc};
use std::cell::Cell;
use std::rc::Rc;
use crate::traits::Clock;

/// Process-wide wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock with frozen time values
///
/// Clones share the same underlying instant, so a test can keep one handle
/// and move time while the coordinator holds another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current_time: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a new manual clock frozen at a specific timestamp
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            current_time: Rc::new(Cell::new(time)),
        }
    }

    /// Set the current time
    pub fn set(&self, time: DateTime<Utc>) {
        self.current_time.set(time);
    }

    /// Move the current time forward (or backward, for negative durations)
    pub fn advance(&self, by: Duration) {
        self.current_time.set(self.current_time.get() + by);
    }

    /// Get the current frozen time
    pub fn current(&self) -> DateTime<Utc> {
        self.current_time.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.current()
    }
}
