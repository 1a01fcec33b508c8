//! Duration strings such as `"30s"`, `"15m"`, `"24h"` and `"2d"`.

use anyhow::{bail, Result};
use chrono::Duration;

/// Parse a duration like "7d", "24h", "30m" or "90s". Bare numbers are seconds.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim().to_lowercase();

    let duration = if let Some(days) = value.strip_suffix('d') {
        Duration::days(days.trim().parse()?)
    } else if let Some(hours) = value.strip_suffix('h') {
        Duration::hours(hours.trim().parse()?)
    } else if let Some(mins) = value.strip_suffix('m') {
        Duration::minutes(mins.trim().parse()?)
    } else if let Some(secs) = value.strip_suffix('s') {
        Duration::seconds(secs.trim().parse()?)
    } else {
        Duration::seconds(value.parse()?)
    };

    if duration < Duration::zero() {
        bail!("duration must not be negative: {}", value);
    }
    Ok(duration)
}

/// Format a duration for display.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.num_seconds();

    if secs >= 86400 {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Convert to a std duration, clamping negatives to zero.
pub fn to_std(duration: Duration) -> std::time::Duration {
    duration.to_std().unwrap_or_default()
}
