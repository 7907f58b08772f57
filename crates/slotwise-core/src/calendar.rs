//! # Exception Calendar
//!
//! Blackout dates that close a business regardless of its weekly schedule.
//!
//! ## Storage vs. Display
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Stored (one row per date)          Displayed (derived, never stored)  │
//! │  ─────────────────────────          ─────────────────────────────────  │
//! │  2026-08-03  "Summer break"                                            │
//! │  2026-08-04  "Summer break"   ──►   2026-08-03..08-05 "Summer break"   │
//! │  2026-08-05  "Summer break"                                            │
//! │  2026-08-07  None             ──►   2026-08-07 (single day)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A range insert expands to one row per date; [`group_ranges`] folds the
//! sorted rows back into contiguous runs that share a reason.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ConfigurationError;
use crate::MAX_DAY_OFF_RANGE_DAYS;

// =============================================================================
// Day Off
// =============================================================================

/// A single closed calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DayOff {
    pub id: String,
    pub business_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub reason: Option<String>,
}

/// A contiguous run of days off sharing one reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DayOffRange {
    #[ts(as = "String")]
    pub start: NaiveDate,
    /// Inclusive.
    #[ts(as = "String")]
    pub end: NaiveDate,
    pub reason: Option<String>,
    /// Row ids covered by this run, in date order.
    pub day_off_ids: Vec<String>,
}

impl DayOffRange {
    /// Number of dates in the run.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// True if this run is a single date.
    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

/// Expands an inclusive date range to every date in it.
///
/// ## Errors
/// - `InvalidDateRange` when `end < start`
/// - `DateRangeTooLong` when the range exceeds `MAX_DAY_OFF_RANGE_DAYS`
pub fn expand_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, ConfigurationError> {
    if end < start {
        return Err(ConfigurationError::InvalidDateRange { start, end });
    }
    let days = (end - start).num_days() + 1;
    if days > MAX_DAY_OFF_RANGE_DAYS {
        return Err(ConfigurationError::DateRangeTooLong {
            max: MAX_DAY_OFF_RANGE_DAYS,
        });
    }
    Ok((0..days).map(|offset| start + Duration::days(offset)).collect())
}

/// Folds days off into contiguous same-reason runs, sorted by start date.
pub fn group_ranges(days_off: &[DayOff]) -> Vec<DayOffRange> {
    let mut sorted: Vec<&DayOff> = days_off.iter().collect();
    sorted.sort_by_key(|d| d.date);

    let mut ranges: Vec<DayOffRange> = Vec::new();
    for day in sorted {
        match ranges.last_mut() {
            Some(run) if run.end.succ_opt() == Some(day.date) && run.reason == day.reason => {
                run.end = day.date;
                run.day_off_ids.push(day.id.clone());
            }
            _ => ranges.push(DayOffRange {
                start: day.date,
                end: day.date,
                reason: day.reason.clone(),
                day_off_ids: vec![day.id.clone()],
            }),
        }
    }
    ranges
}

// =============================================================================
// Exception Calendar
// =============================================================================

/// Lookup structure over a business's days off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionCalendar {
    closed: BTreeMap<NaiveDate, Option<String>>,
}

impl ExceptionCalendar {
    pub fn new() -> Self {
        ExceptionCalendar::default()
    }

    /// Builds the calendar from stored rows.
    pub fn from_days_off<'a>(days_off: impl IntoIterator<Item = &'a DayOff>) -> Self {
        ExceptionCalendar {
            closed: days_off
                .into_iter()
                .map(|d| (d.date, d.reason.clone()))
                .collect(),
        }
    }

    /// Returns true if `date` is a day off.
    #[inline]
    pub fn is_day_off(&self, date: NaiveDate) -> bool {
        self.closed.contains_key(&date)
    }

    /// The reason recorded for a day off, if any.
    pub fn reason(&self, date: NaiveDate) -> Option<&str> {
        self.closed.get(&date).and_then(|r| r.as_deref())
    }

    /// Dates in `[from, to]` that are days off.
    pub fn closed_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
        if to < from {
            return Vec::new();
        }
        self.closed.range(from..=to).map(|(d, _)| *d).collect()
    }

    pub fn len(&self) -> usize {
        self.closed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closed.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
