//! Utility functions for the logger
//!
//! Timestamps, header flattening, host extraction and duration formatting.

use std::fmt::Write as _;
use std::time::Duration;

use actix_web::http::header::{HeaderMap, HOST};
use actix_web::http::Uri;
use chrono::Utc;

/// Format of the record timestamp: ISO 8601 basic calendar date (`YYYYMMDD`)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d";

/// Current UTC date as `YYYYMMDD`
pub fn current_date() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Flatten request headers into `name: value` lines joined by `\n`.
///
/// Every value is kept. Names are sorted, and the sort is stable so repeated
/// values of one header stay in the order they arrived.
pub fn summarize_headers(headers: &HeaderMap) -> String {
    let mut lines: Vec<(&str, String)> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    lines.sort_by(|a, b| a.0.cmp(b.0));

    lines
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Host the client declared: the `Host` header, else the URI authority
pub fn declared_host(headers: &HeaderMap, uri: &Uri) -> String {
    headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| uri.authority().map(|authority| authority.as_str()))
        .unwrap_or_default()
        .to_string()
}

/// Render a duration the way Go's `time.Duration` prints it (`850ns`, `12.4ms`, `1m30s`),
/// spelling microseconds `us` so the result is a visible-ASCII header value
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}us", decimal(nanos, 1_000));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", decimal(nanos, 1_000_000));
    }

    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = u128::from(total_secs % 60) * 1_000_000_000 + u128::from(duration.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    let _ = write!(out, "{}s", decimal(seconds, 1_000_000_000));
    out
}

/// `value / unit` with trailing fractional zeros trimmed
fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let fraction = value % unit;
    if fraction == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{fraction:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
