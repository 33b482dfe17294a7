//! Timestamp helpers shared across the workspace.

use chrono::{DateTime, Utc};

/// A millisecond-epoch timestamp, the unit spans (§4.7) and execution
/// records (§4.5) are defined in terms of.
pub type EpochMillis = i64;

/// Current wall-clock time as milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> EpochMillis {
    Utc::now().timestamp_millis()
}

/// Current wall-clock time as a [`DateTime<Utc>`].
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
