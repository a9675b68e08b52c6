//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for sample times and persistence bookkeeping.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Truncate a timestamp to whole seconds.
///
/// Time-series stores only keep one sample per second and source, so sample
/// times are aligned on the second boundary before comparison.
#[must_use]
pub fn truncate_to_seconds(ts: Timestamp) -> Timestamp {
    DateTime::from_timestamp(ts.timestamp(), 0).unwrap_or(ts)
}
