//! Time-range bound interpretation
//!
//! ISO dates become bound parameters. Recognized relative phrases become
//! fixed SQL expressions over `CURRENT_DATE`; the numeric day count is
//! parsed and re-rendered, so no user text reaches the SQL string.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// How a single time bound compiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeBound {
    /// An ISO date/datetime, shipped as a parameter.
    Iso(String),
    /// A fixed, non-user-controlled SQL expression, safe to inline.
    Expression(String),
}

/// Interpret one time-range bound. Returns `None` for text that is neither
/// an ISO date nor a recognized relative phrase.
pub fn parse_bound(text: &str) -> Option<TimeBound> {
    let trimmed = text.trim();
    if is_iso_date(trimmed) {
        return Some(TimeBound::Iso(trimmed.to_string()));
    }
    relative_expression(trimmed).map(TimeBound::Expression)
}

fn is_iso_date(text: &str) -> bool {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").is_ok()
        || DateTime::parse_from_rfc3339(text).is_ok()
}

fn relative_expression(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    match lowered.as_str() {
        "this week" => return Some("DATE_TRUNC('week', CURRENT_DATE)".to_string()),
        "this month" => return Some("DATE_TRUNC('month', CURRENT_DATE)".to_string()),
        _ => {}
    }

    // "last N days" (or "last 1 day")
    let parts: Vec<&str> = lowered.split_whitespace().collect();
    if let ["last", count, unit] = parts.as_slice() {
        if matches!(*unit, "day" | "days") {
            if let Ok(days) = count.parse::<u32>() {
                return Some(format!("CURRENT_DATE - INTERVAL '{days} days'"));
            }
        }
    }

    None
}
