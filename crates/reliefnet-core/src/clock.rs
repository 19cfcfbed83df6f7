//! Clock abstraction for deterministic timestamps.

use chrono::{DateTime, Utc};

/// Source of the current time, injected wherever records are stamped so that
/// tests can pin it.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the operating system.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
