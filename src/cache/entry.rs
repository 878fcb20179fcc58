//! Cache Entry Module
//!
//! Defines a stored value together with the time it was last written.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Point in time an entry was created or last refreshed.
pub type Timestamp = DateTime<Utc>;

// == Entry ==
/// A single stored value and its write timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<V> {
    /// The stored value
    pub value: V,
    /// Creation or last refresh time
    pub timestamp: Timestamp,
}

impl<V> Entry<V> {
    // == Constructor ==
    /// Creates a new entry written at `timestamp`.
    pub fn new(value: V, timestamp: Timestamp) -> Self {
        Self { value, timestamp }
    }

    // == Refresh ==
    /// Replaces the value and moves the timestamp forward.
    ///
    /// A `timestamp` older than the current one is clamped so the entry's
    /// timestamp never decreases.
    pub fn refresh(&mut self, value: V, timestamp: Timestamp) {
        self.value = value;
        self.timestamp = self.timestamp.max(timestamp);
    }

    // == Age ==
    /// Elapsed time between the last write and `now`.
    ///
    /// Timestamps in the future yield an age of zero.
    pub fn age(&self, now: Timestamp) -> Duration {
        (now - self.timestamp).to_std().unwrap_or(Duration::ZERO)
    }

    // == Is Expired ==
    /// Checks whether the entry is stale at `now`.
    ///
    /// Boundary condition: an entry whose age equals `max_age` is expired, so
    /// a zero `max_age` makes every entry stale as soon as it is written.
    pub fn is_expired(&self, now: Timestamp, max_age: Duration) -> bool {
        self.age(now) >= max_age
    }

    // == Time To Live ==
    /// Remaining time before the entry expires, or `None` once it has.
    pub fn ttl(&self, now: Timestamp, max_age: Duration) -> Option<Duration> {
        max_age
            .checked_sub(self.age(now))
            .filter(|remaining| !remaining.is_zero())
    }
}

// == Utility Functions ==
/// Returns the current wall-clock time.
pub fn now() -> Timestamp {
    Utc::now()
}
