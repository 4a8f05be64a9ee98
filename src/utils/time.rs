//! Time utilities: whole-second deltas, DB timestamp codec, duration formatting.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};

/// Whole seconds from `from` to `to`. Fractions are truncated, and a clock
/// that moved backwards yields zero so accrued durations never shrink.
pub fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().max(0)
}

/// Drop sub-second precision before an instant is persisted.
pub fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(0)
}

/// Convert instant → DB string (RFC 3339, UTC, whole seconds)
pub fn to_db_timestamp(dt: DateTime<Utc>) -> String {
    truncate_to_seconds(dt).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Convert DB string → instant
pub fn from_db_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format seconds as HH:MM:SS (hours may exceed 24).
pub fn format_seconds(secs: i64) -> String {
    let sign = if secs < 0 { "-" } else { "" };
    let s = secs.abs();
    format!("{}{:02}:{:02}:{:02}", sign, s / 3600, (s % 3600) / 60, s % 60)
}

/// Format a decimal hour figure, e.g. 0.75 → "0.75h".
pub fn format_hours(hours: f64) -> String {
    format!("{:.2}h", hours)
}

/// Validate a rate period (`YYYY-MM`) and return it normalized.
pub fn parse_period(p: &str) -> Option<String> {
    NaiveDate::parse_from_str(&format!("{}-01", p.trim()), "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m").to_string())
}

/// Rate period containing `dt`.
pub fn period_of(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m").to_string()
}
