//! Common utilities shared across modules.
//!
//! Date bucketing helpers live here so every query that mentions "today"
//! or a trailing window derives it from the same clock.

use chrono::{Datelike, Duration, Local, NaiveDate};
use std::path::PathBuf;

/// Number of trailing days covered by the heatmap window (today inclusive).
pub const HEATMAP_WINDOW_DAYS: i64 = 180;

/// Number of trailing days covered by the "week" time window (today inclusive).
pub const WEEK_WINDOW_DAYS: i64 = 7;

/// Gets the application data directory using XDG Base Directory specification.
///
/// Returns `~/.local/share/study-ledger/` on Unix-like systems.
pub fn get_data_dir() -> PathBuf {
    // Use dirs crate for proper XDG handling
    let base_dir = dirs::data_dir().unwrap_or_else(|| {
        // Fallback if dirs crate fails
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".local").join("share")
    });

    base_dir.join("study-ledger")
}

/// Gets the current timestamp in ISO 8601 format.
pub fn current_timestamp() -> String {
    Local::now().to_rfc3339()
}

/// Gets the current date in YYYY-MM-DD format.
///
/// This is the date every write is bucketed under; clients never supply it.
pub fn current_date() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// First day of a trailing window of `days` days ending today (inclusive).
///
/// `window_start(7)` on 2024-03-10 returns `"2024-03-04"`, so a
/// `date >= start` filter covers exactly seven calendar days.
pub fn window_start(days: i64) -> String {
    (Local::now().date_naive() - Duration::days(days - 1))
        .format("%Y-%m-%d")
        .to_string()
}

/// Human-readable label for a `YYYY-MM` month key, e.g. `"Jan 2024"`.
///
/// Falls back to the raw key if it does not parse as a month.
pub fn month_label(month_key: &str) -> String {
    match NaiveDate::parse_from_str(&format!("{}-01", month_key), "%Y-%m-%d") {
        Ok(date) => date.format("%b %Y").to_string(),
        Err(_) => month_key.to_string(),
    }
}

/// First calendar day of a `YYYY-MM` month key, used as a sortable timestamp.
pub fn month_start(month_key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", month_key), "%Y-%m-%d").ok()
}

/// True if `date` (YYYY-MM-DD) falls in the current local month.
#[allow(dead_code)]
pub fn in_current_month(date: &str) -> bool {
    let now = Local::now();
    date.starts_with(&format!("{:04}-{:02}", now.year(), now.month()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_data_dir() {
        let dir = get_data_dir();
        assert!(dir.to_string_lossy().contains("study-ledger"));
    }

    #[test]
    fn test_current_timestamp() {
        let ts = current_timestamp();
        assert!(ts.contains("T"));
        assert!(ts.contains(":"));
    }

    #[test]
    fn test_current_date() {
        let date = current_date();
        assert_eq!(date.len(), 10);
        assert!(date.contains("-"));
    }

    #[test]
    fn test_window_start_covers_today() {
        // A 1-day window starts today
        assert_eq!(window_start(1), current_date());
    }

    #[test]
    fn test_window_start_week() {
        let start = window_start(WEEK_WINDOW_DAYS);
        assert_eq!(start.len(), 10);
        assert!(start < current_date() || WEEK_WINDOW_DAYS == 1);
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label("2024-01"), "Jan 2024");
        assert_eq!(month_label("2023-12"), "Dec 2023");
        // Unparseable keys pass through untouched
        assert_eq!(month_label("garbage"), "garbage");
    }

    #[test]
    fn test_month_start() {
        let start = month_start("2024-03").unwrap();
        assert_eq!(start.to_string(), "2024-03-01");
        assert!(month_start("not-a-month").is_none());
    }
}
