//! Formatting helpers for presenting tasks.

use chrono::{Local, TimeZone};

/// Shorten long task ids to `first8...last4`.
pub fn shorten_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 12 {
        return id.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Render a span of seconds as `1h 2m 3s`, dropping leading zero units.
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0s".to_string();
    }
    let total = seconds.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }
    parts.join(" ")
}

/// Local wall-clock `HH:MM:SS` of a Unix timestamp, `--:--:--` when absent.
pub fn format_clock(timestamp: Option<f64>) -> String {
    timestamp
        .and_then(to_local)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

/// Local `YYYY-MM-DD HH:MM:SS` of a Unix timestamp, `--:--:--` when absent.
pub fn format_datetime(timestamp: Option<f64>) -> String {
    timestamp
        .and_then(to_local)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

fn to_local(timestamp: f64) -> Option<chrono::DateTime<Local>> {
    if !timestamp.is_finite() || timestamp <= 0.0 {
        return None;
    }
    let secs = timestamp.trunc() as i64;
    let nanos = (timestamp.fract() * 1e9) as u32;
    Local.timestamp_opt(secs, nanos).single()
}
