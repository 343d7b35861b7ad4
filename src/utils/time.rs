//! Epoch unit conversion between the bridge (milliseconds) and native stores (seconds).

use chrono::{DateTime, TimeZone, Utc};

const MILLIS_PER_SECOND: f64 = 1000.0;

pub fn millis_to_seconds(millis: f64) -> f64 {
    millis / MILLIS_PER_SECOND
}

pub fn seconds_to_millis(seconds: f64) -> f64 {
    seconds * MILLIS_PER_SECOND
}

/// Current wall clock as bridge milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Native seconds as a UTC timestamp, for log lines. `None` when out of range.
pub fn seconds_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    let millis = seconds_to_millis(seconds);
    if !millis.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(millis.round() as i64).single()
}
