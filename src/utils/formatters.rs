use chrono::{DateTime, Utc};

/// Formats bytes into human-readable size
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    #[allow(clippy::cast_precision_loss)]
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{bytes} {}", UNITS[unit_index])
    } else {
        format!("{size:.2} {}", UNITS[unit_index])
    }
}

/// Formats `time` relative to `now`, e.g. `3 days ago` or `2 hours from now`
#[must_use]
pub fn format_relative_time(now: &DateTime<Utc>, time: &DateTime<Utc>) -> String {
    let diff = now.timestamp() - time.timestamp();

    if diff == 0 {
        return "now".to_string();
    }

    let suffix = if diff < 0 { "from now" } else { "ago" };
    let diff = diff.abs();

    let (value, unit) = if diff < 60 {
        (diff, "second")
    } else if diff < 3600 {
        (diff / 60, "minute")
    } else if diff < 86400 {
        (diff / 3600, "hour")
    } else if diff < 2_592_000 {
        (diff / 86400, "day")
    } else if diff < 31_536_000 {
        (diff / 2_592_000, "month")
    } else {
        (diff / 31_536_000, "year")
    };

    if value == 1 {
        format!("{value} {unit} {suffix}")
    } else {
        format!("{value} {unit}s {suffix}")
    }
}

/// Formats a build or load duration, keeping sub-second precision only when
/// the whole operation took less than a second
#[must_use]
pub fn format_elapsed(elapsed: std::time::Duration) -> String {
    let rounded = std::time::Duration::from_secs(elapsed.as_secs());
    if rounded.is_zero() {
        let millis = std::time::Duration::from_millis(
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        );
        return humantime::format_duration(millis).to_string();
    }
    humantime::format_duration(rounded).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1_572_864), "1.50 MB");
    }

    #[test]
    fn test_relative_time_past_and_future() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let earlier = Utc.timestamp_opt(1_700_000_000 - 7200, 0).unwrap();
        let later = Utc.timestamp_opt(1_700_000_000 + 60, 0).unwrap();

        assert_eq!(format_relative_time(&now, &earlier), "2 hours ago");
        assert_eq!(format_relative_time(&now, &later), "1 minute from now");
        assert_eq!(format_relative_time(&now, &now), "now");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(250)), "250ms");
        assert_eq!(format_elapsed(Duration::from_millis(61_400)), "1m 1s");
    }
}
