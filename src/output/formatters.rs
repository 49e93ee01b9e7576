//! Reusable formatting utilities for CLI output
//!
//! Ages, sizes, timestamps and the freshness line shown under every reading.

use chrono::{DateTime, Utc};
use colored::Colorize;

use super::json::CacheMeta;

/// Compact age: `3s ago`, `4m ago`, `2h ago`, `3d ago`.
///
/// Negative ages (clock skew) read as `just now`.
pub fn describe_age(age_secs: i64) -> String {
    match age_secs {
        s if s <= 0 => "just now".to_string(),
        s if s < 60 => format!("{}s ago", s),
        s if s < 60 * 60 => format!("{}m ago", s / 60),
        s if s < 24 * 60 * 60 => format!("{}h ago", s / 3600),
        s => format!("{}d ago", s / 86400),
    }
}

/// Freshness line for a reading, e.g. `updated 3s ago (stale: Device request timed out)`
pub fn freshness_line(meta: &CacheMeta) -> String {
    let mut line = format!("updated {}", describe_age(meta.age_secs));

    if meta.stale {
        line = format!("{} {}", line, "(stale)".yellow());
    }
    if let Some(err) = &meta.fetch_error {
        line = format!("{} {}", line, format!("- refresh failed: {}", err).red());
    }
    if let Some(err) = &meta.write_error {
        line = format!("{} {}", line, format!("- not cached: {}", err).red());
    }
    line
}

/// Short freshness label for table cells
pub fn freshness_cell(meta: &CacheMeta) -> String {
    let age = describe_age(meta.age_secs);
    if meta.stale {
        format!("{} (stale)", age)
    } else {
        age
    }
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Local date/time, minute precision
pub fn format_timestamp_local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(stale: bool, fetch_error: Option<&str>) -> CacheMeta {
        CacheMeta {
            stale,
            fetched_at: Utc::now(),
            age_secs: 3,
            source: "cache".to_string(),
            fetch_error: fetch_error.map(str::to_string),
            write_error: None,
        }
    }

    #[test]
    fn test_describe_age() {
        assert_eq!(describe_age(-5), "just now");
        assert_eq!(describe_age(0), "just now");
        assert_eq!(describe_age(3), "3s ago");
        assert_eq!(describe_age(59), "59s ago");
        assert_eq!(describe_age(61), "1m ago");
        assert_eq!(describe_age(2 * 3600 + 5), "2h ago");
        assert_eq!(describe_age(3 * 86400), "3d ago");
    }

    #[test]
    fn test_freshness_line() {
        colored::control::set_override(false);

        assert_eq!(freshness_line(&meta(false, None)), "updated 3s ago");
        assert_eq!(
            freshness_line(&meta(true, Some("Device request timed out"))),
            "updated 3s ago (stale) - refresh failed: Device request timed out"
        );
    }

    #[test]
    fn test_freshness_cell() {
        assert_eq!(freshness_cell(&meta(false, None)), "3s ago");
        assert_eq!(freshness_cell(&meta(true, None)), "3s ago (stale)");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
