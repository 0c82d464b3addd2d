use chrono::{DateTime, Utc};

/// Formats a UTC instant as `YYYY-DDD-HH:MM:SS.sss` (day-of-year form).
pub fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%j-%H:%M:%S%.3f").to_string()
}

/// The current time in `YYYY-DDD-HH:MM:SS.sss` form.
pub fn now_string() -> String {
    format_time(Utc::now())
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
