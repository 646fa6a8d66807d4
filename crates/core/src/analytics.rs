//! Pure aggregation helpers for the analytics summary.
//!
//! The aggregator never trusts frozen per-image counts: every stored
//! detection set is reclassified under the active thresholds via
//! [`crate::severity`], so the functions here only bucket and key the
//! already-reclassified counts.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::CoreError;
use crate::severity::SeverityCounts;
use crate::types::Timestamp;

/// Severity bucket of a whole activity, by precedence over its images'
/// reclassified detections: high wins over medium, medium over low, and
/// an activity with zero detections (or zero images) is `none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivitySeverity {
    None,
    Low,
    Medium,
    High,
}

impl ActivitySeverity {
    pub fn bucket(counts: &SeverityCounts) -> Self {
        if counts.high > 0 {
            ActivitySeverity::High
        } else if counts.medium > 0 {
            ActivitySeverity::Medium
        } else if counts.low > 0 {
            ActivitySeverity::Low
        } else {
            ActivitySeverity::None
        }
    }
}

/// Calendar-day key, `YYYY-MM-DD`.
pub fn day_key(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// Calendar-month key, `YYYY-MM`.
pub fn month_key(ts: &Timestamp) -> String {
    ts.format("%Y-%m").to_string()
}

/// English weekday name, e.g. `"Monday"`.
pub fn weekday_name(ts: &Timestamp) -> String {
    ts.format("%A").to_string()
}

/// Every calendar day of the given month, in order.
///
/// Rejects months outside `1..=12` and years chrono cannot represent.
pub fn month_days(year: i32, month: u32) -> Result<Vec<NaiveDate>, CoreError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        CoreError::Validation(format!("Invalid year/month: {year}-{month:02}"))
    })?;

    let mut days = Vec::with_capacity(31);
    let mut day = first;
    while day.month() == month {
        days.push(day);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    Ok(days)
}

/// Half-open `[first, first-of-next-month)` bounds of the given month.
///
/// The exclusive upper bound is what makes a timestamp in the sub-second
/// tail of the month's final second still count as inside the month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), CoreError> {
    let days = month_days(year, month)?;
    // month_days never returns an empty Vec for a valid month.
    let next = days[days.len() - 1].succ_opt().ok_or_else(|| {
        CoreError::Validation(format!("Unsupported year/month: {year}-{month:02}"))
    })?;
    Ok((days[0], next))
}
