//! Shared formatting helpers for the TUI and batch output.
//!
//! All pure formatting functions (no ratatui styles, no UI layout) live here.
//! Functions that differ between compact matrix cells and the wider flat table
//! are parameterized via [`FmtStyle`].

/// Controls compact (matrix cells) vs verbose (flat table) output.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FmtStyle {
    /// Compact: fixed six characters, single-letter unit (`"  1.5G"`)
    Compact,
    /// Detail: spaces, full suffixes (`"1.5 GiB/s"`)
    Detail,
}

/// Placeholder for rates that are not known.
pub const UNKNOWN: &str = "-";

const DETAIL_UNITS: [&str; 7] = [
    " B/s", " KiB/s", " MiB/s", " GiB/s", " TiB/s", " PiB/s", " EiB/s",
];
const COMPACT_UNITS: [&str; 7] = [" ", "K", "M", "G", "T", "P", "E"];

/// Width of a compact cell, unit letter included.
pub const COMPACT_WIDTH: usize = 6;

/// Scales `rate` by powers of 1024 and returns the scaled value with its unit index.
fn scale(rate: f64) -> (f64, usize) {
    let mut value = rate;
    let mut unit = 0;
    while value >= 1024.0 && unit < DETAIL_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    (value, unit)
}

/// Format bytes-per-second rate as human-readable, `"-"` for unknown.
///
/// Compact: `"  1.5G"`, `"512.0 "`, `"  0.0 "` (always six characters; values
/// that would print as 1000.0–1023.9 move up a unit to keep the width)
/// Detail:  `"1.5 GiB/s"`, `"100.3 MiB/s"`, `"512 B/s"`
pub fn format_bytes_rate(rate: Option<f64>, style: FmtStyle) -> String {
    let Some(rate) = rate.filter(|r| r.is_finite()) else {
        return match style {
            FmtStyle::Compact => format!("{:^width$}", UNKNOWN, width = COMPACT_WIDTH),
            FmtStyle::Detail => UNKNOWN.to_string(),
        };
    };
    let rate = rate.max(0.0);
    let (mut value, mut unit) = scale(rate);
    match style {
        FmtStyle::Compact => {
            if format!("{:.1}", value).len() > COMPACT_WIDTH - 1 && unit < COMPACT_UNITS.len() - 1
            {
                value /= 1024.0;
                unit += 1;
            }
            format!(
                "{:>width$.1}{}",
                value,
                COMPACT_UNITS[unit],
                width = COMPACT_WIDTH - 1
            )
        }
        FmtStyle::Detail => {
            if unit == 0 {
                format!("{:.0}{}", value, DETAIL_UNITS[0])
            } else {
                format!("{:.1}{}", value, DETAIL_UNITS[unit])
            }
        }
    }
}

/// Format a rate that may be only partially known (some contributors unknown).
///
/// Partial values get a trailing `*` in detail style.
pub fn format_total(rate: f64, partial: bool, style: FmtStyle) -> String {
    let s = format_bytes_rate(Some(rate), style);
    if partial && style == FmtStyle::Detail {
        format!("{}*", s)
    } else {
        s
    }
}

/// Format seconds with one decimal: `"3.0s"`.
pub fn format_secs(secs: f64) -> String {
    format!("{:.1}s", secs)
}

/// Pad `s` on the right with `fill` up to `width` characters.
pub fn pad_right(s: &str, width: usize, fill: char) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let mut out = String::with_capacity(width);
    out.push_str(s);
    out.extend(std::iter::repeat_n(fill, width - len));
    out
}

/// Center `s` within `width` characters using `fill`.
pub fn center(s: &str, width: usize, fill: char) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    let mut out = String::with_capacity(width);
    out.extend(std::iter::repeat_n(fill, left));
    out.push_str(s);
    out.extend(std::iter::repeat_n(fill, right));
    out
}

/// Truncate string to max length with unicode ellipsis (`…`).
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
