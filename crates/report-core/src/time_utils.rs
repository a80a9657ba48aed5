use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tracing::warn;

use crate::models::MeridiemMode;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Validate that `tz_name` is a recognised IANA timezone identifier.
pub fn validate_timezone(tz_name: &str) -> bool {
    tz_name.parse::<Tz>().is_ok()
}

/// Resolve a timezone name, with `"auto"` meaning the system timezone.
///
/// Unrecognised names fall back to UTC with a warning.
pub fn resolve_timezone(tz_name: &str) -> Tz {
    let name = if tz_name == "auto" {
        get_system_timezone()
    } else {
        tz_name.to_string()
    };
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!("unrecognised timezone \"{}\", falling back to UTC", name);
        Tz::UTC
    })
}

/// Today's calendar date in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

// ── Clock-time parsing ────────────────────────────────────────────────────────

fn embedded_time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{2}:\d{2}:\d{2} [APM]{2}").expect("regex is valid"))
}

/// Extract the first `HH:MM:SS AM/PM` token from free text.
pub fn extract_embedded_time(text: &str) -> Option<&str> {
    embedded_time_regex().find(text).map(|m| m.as_str())
}

/// Split a trailing AM/PM marker off a clock string.
///
/// Returns the clock digits and the upper-cased marker, if any.
fn split_meridiem(raw: &str) -> (&str, Option<String>) {
    let trimmed = raw.trim();
    let cut = trimmed.len().saturating_sub(2);
    if trimmed.len() >= 2 && trimmed.is_char_boundary(cut) {
        let (head, tail) = trimmed.split_at(cut);
        let marker = tail.to_uppercase();
        if marker == "AM" || marker == "PM" {
            return (head.trim_end(), Some(marker));
        }
    }
    (trimmed, None)
}

/// Parse a clock time such as `"09:00:00"`, `"9:00:00 AM"` or `"13:05:10"`.
///
/// In [`MeridiemMode::Strip`] the AM/PM marker is discarded and the digits
/// are read as a 24-hour clock. In [`MeridiemMode::Honor`] a marker switches
/// parsing to a 12-hour clock. Returns `None` on any format mismatch.
pub fn parse_clock_time(raw: &str, mode: MeridiemMode) -> Option<NaiveTime> {
    let (digits, marker) = split_meridiem(raw);
    if digits.is_empty() {
        return None;
    }

    match (mode, marker) {
        (MeridiemMode::Honor, Some(marker)) => {
            NaiveTime::parse_from_str(&format!("{} {}", digits, marker), "%I:%M:%S %p").ok()
        }
        _ => NaiveTime::parse_from_str(digits, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(digits, "%H:%M:%S%.f"))
            .ok(),
    }
}

/// Minutes between a start time and the time embedded in free text,
/// discarding AM/PM markers.
///
/// See [`parse_duration_with`].
pub fn parse_duration(start_raw: &str, embedded_raw: &str) -> Option<f64> {
    parse_duration_with(start_raw, embedded_raw, MeridiemMode::Strip)
}

/// Minutes from `start_raw` to the `HH:MM:SS AM/PM` token inside
/// `embedded_raw`.
///
/// Returns `None` when the token is missing or either time fails to parse.
/// A negative result (embedded time before the start) is returned as is.
pub fn parse_duration_with(start_raw: &str, embedded_raw: &str, mode: MeridiemMode) -> Option<f64> {
    let token = extract_embedded_time(embedded_raw)?;
    let embedded = parse_clock_time(token, mode)?;
    let start = parse_clock_time(start_raw, mode)?;
    let delta = embedded - start;
    Some(delta.num_milliseconds() as f64 / 60_000.0)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
