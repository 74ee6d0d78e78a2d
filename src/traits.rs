//! Core traits for the coordinator

use chrono::{DateTime, Utc};
use crate::error::ActionError;

/// A registered reversal operation, run at most once during rollback
pub trait CompensatingAction {
    /// Undo the side effect this action was registered for
    fn compensate(self: Box<Self>) -> Result<(), ActionError>;
}

impl<F> CompensatingAction for F
where
    F: FnOnce() -> Result<(), ActionError>,
{
    fn compensate(self: Box<Self>) -> Result<(), ActionError> {
        (*self)()
    }
}

/// Source of timestamps for frames and audit entries
pub trait Clock {
    /// Get the current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Adapt a compensation that cannot fail
pub fn infallible<F>(f: F) -> impl FnOnce() -> Result<(), ActionError>
where
    F: FnOnce(),
{
    move || {
        f();
        Ok(())
    }
}
