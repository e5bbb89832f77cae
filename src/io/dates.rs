//! Date column parsing.
//!
//! Strategy:
//! 1. Try each known format against the whole column; the first format that
//!    parses every non-empty value wins (so `01/02/2024` resolves day-first).
//! 2. Otherwise parse value by value with a tolerant, day-first list of formats.
//!    Values that still fail become `None`; the caller reports them.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Whole-column formats, in priority order: `(chrono format, display label)`.
pub const COLUMN_FORMATS: [(&str, &str); 4] = [
    ("%d/%m/%Y", "DD/MM/YYYY"),
    ("%m/%d/%Y", "MM/DD/YYYY"),
    ("%Y-%m-%d", "YYYY-MM-DD"),
    ("%d-%m-%Y", "DD-MM-YYYY"),
];

/// Per-value fallback formats (day-first bias).
const TOLERANT_FORMATS: [&str; 18] = [
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%y",
    "%d-%m-%y",
    "%d.%m.%y",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%m/%d/%y",
];

/// Which strategy resolved the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateFormat {
    /// A single known format parsed every value.
    Fixed(&'static str),
    /// Values were parsed one by one with the tolerant fallback.
    Tolerant,
}

impl std::fmt::Display for DateFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateFormat::Fixed(label) => write!(f, "{label}"),
            DateFormat::Tolerant => write!(f, "mixed (day-first fallback)"),
        }
    }
}

/// Parse a full date column. The output has one entry per input value.
pub fn parse_date_column(values: &[&str]) -> (Vec<Option<NaiveDate>>, DateFormat) {
    let non_empty: Vec<&str> = values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).collect();

    if !non_empty.is_empty() {
        for (fmt, label) in COLUMN_FORMATS {
            if non_empty.iter().all(|v| parse_with(v, fmt).is_some()) {
                let dates = values.iter().map(|v| parse_with(v.trim(), fmt)).collect();
                return (dates, DateFormat::Fixed(label));
            }
        }
    }

    let dates = values.iter().map(|v| parse_date_tolerant(v)).collect();
    (dates, DateFormat::Tolerant)
}

/// Best-effort, day-first parse of a single value.
///
/// Trailing time components (`2024-01-15T10:00`, `15/01/2024 10:30`) are ignored.
pub fn parse_date_tolerant(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Some(d) = TOLERANT_FORMATS.iter().find_map(|fmt| parse_with(value, fmt)) {
        return Some(d);
    }

    let head = value.split(['T', ' ']).next().unwrap_or(value);
    if head.len() < value.len() {
        return TOLERANT_FORMATS.iter().find_map(|fmt| parse_with(head, fmt));
    }
    None
}

fn parse_with(value: &str, fmt: &str) -> Option<NaiveDate> {
    let d = NaiveDate::parse_from_str(value, fmt).ok()?;
    // `%Y` happily accepts `24` as year 24; leave two-digit years to `%y`.
    if (1000..=9999).contains(&d.year()) { Some(d) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn day_first_wins_when_ambiguous() {
        let (dates, fmt) = parse_date_column(&["01/02/2024", "03/04/2024"]);
        assert_eq!(fmt, DateFormat::Fixed("DD/MM/YYYY"));
        assert_eq!(dates, vec![ymd(2024, 2, 1), ymd(2024, 4, 3)]);
    }

    #[test]
    fn month_first_column_is_detected() {
        let (dates, fmt) = parse_date_column(&["01/02/2024", "12/31/2024"]);
        assert_eq!(fmt, DateFormat::Fixed("MM/DD/YYYY"));
        assert_eq!(dates, vec![ymd(2024, 1, 2), ymd(2024, 12, 31)]);
    }

    #[test]
    fn iso_and_dashed_columns() {
        let (_, fmt) = parse_date_column(&["2024-01-31", "2023-12-01"]);
        assert_eq!(fmt, DateFormat::Fixed("YYYY-MM-DD"));

        let (dates, fmt) = parse_date_column(&["31-01-2024"]);
        assert_eq!(fmt, DateFormat::Fixed("DD-MM-YYYY"));
        assert_eq!(dates, vec![ymd(2024, 1, 31)]);
    }

    #[test]
    fn mixed_column_falls_back_and_marks_invalid() {
        let (dates, fmt) = parse_date_column(&["2024-01-31", "15/02/2024", "not a date", ""]);
        assert_eq!(fmt, DateFormat::Tolerant);
        assert_eq!(dates, vec![ymd(2024, 1, 31), ymd(2024, 2, 15), None, None]);
    }

    #[test]
    fn tolerant_handles_common_shapes() {
        assert_eq!(parse_date_tolerant("15.03.2024"), ymd(2024, 3, 15));
        assert_eq!(parse_date_tolerant("15/03/24"), ymd(2024, 3, 15));
        assert_eq!(parse_date_tolerant("2024-03-15T08:30:00"), ymd(2024, 3, 15));
        assert_eq!(parse_date_tolerant("15/03/2024 08:30"), ymd(2024, 3, 15));
        assert_eq!(parse_date_tolerant("15 Mar 2024"), ymd(2024, 3, 15));
        assert_eq!(parse_date_tolerant("32/13/2024"), None);
    }
}
