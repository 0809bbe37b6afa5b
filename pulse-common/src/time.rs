//! Timestamp utilities

use chrono::{DateTime, Duration, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Default session start when none is supplied: one hour from now
pub fn default_session_start() -> DateTime<Utc> {
    Utc::now() + Duration::hours(1)
}
