use unicode_width::UnicodeWidthStr;

/// Format an integer count with thousands separators.
///
/// # Examples
///
/// ```
/// use report_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1234), "1,234");
/// assert_eq!(format_count(1234567), "1,234,567");
/// ```
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && i % 3 == offset {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a bucket edge without a trailing `.0` for whole minutes.
///
/// # Examples
///
/// ```
/// use report_core::formatting::format_edge;
///
/// assert_eq!(format_edge(20.0), "20");
/// assert_eq!(format_edge(2.5), "2.5");
/// ```
pub fn format_edge(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Format a duration in minutes for display, keeping the sign.
///
/// * under an hour → `"45.5 min"`
/// * an hour or more → `"2h 05m"`
///
/// # Examples
///
/// ```
/// use report_core::formatting::format_minutes;
///
/// assert_eq!(format_minutes(45.5), "45.5 min");
/// assert_eq!(format_minutes(125.0), "2h 05m");
/// assert_eq!(format_minutes(-3.0), "-3.0 min");
/// ```
pub fn format_minutes(minutes: f64) -> String {
    let sign = if minutes < 0.0 { "-" } else { "" };
    let abs = minutes.abs();
    if abs < 60.0 {
        format!("{}{:.1} min", sign, abs)
    } else {
        let total = abs.round() as u64;
        format!("{}{}h {:02}m", sign, total / 60, total % 60)
    }
}

/// `part / whole * 100`, rounded to one decimal place; `0.0` when `whole`
/// is zero.
pub fn share_percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = part as f64 / whole as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

/// Right-pad `label` with spaces to `width` terminal columns.
///
/// Labels wider than `width` are returned unchanged.
pub fn pad_label(label: &str, width: usize) -> String {
    let current = UnicodeWidthStr::width(label);
    if current >= width {
        label.to_string()
    } else {
        format!("{}{}", label, " ".repeat(width - current))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
