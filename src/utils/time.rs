//! Time formatting utilities

use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};

/// Format seconds to HH:MM:SS.mmm, dropping the hours when zero
pub fn format_seconds(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, millis)
    }
}

/// RFC 3339 timestamp in UTC
pub fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// RFC 3339 timestamp `offset` from now
pub fn rfc3339_in(offset: std::time::Duration) -> String {
    rfc3339(SystemTime::now() + offset)
}
