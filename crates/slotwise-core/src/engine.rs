//! # Slot Generation Engine
//!
//! Pure computation of the bookable start times for one date and offering.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      generate_slots()                                   │
//! │                                                                         │
//! │  1. Closed?  day off │ day disabled │ offering not offered │ past date  │
//! │       │                                    └──► []  (not an error)      │
//! │       ▼                                                                 │
//! │  2. duration = offering duration, step = day.slot_duration              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. For each window (morning, then afternoon):                          │
//! │       t = start; while t + duration <= end { emit t; t += step }        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. Today? keep only t > now                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  5. occupied = occupancy(t); available = occupied < effective max       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The output is advisory. Nothing is held until a reservation commits.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::calendar::ExceptionCalendar;
use crate::capacity::CapacityPolicy;
use crate::catalog::Offering;
use crate::schedule::{minutes_of, DaySchedule, WeeklySchedule};
use crate::types::Slot;

/// Why a date produces no slots at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Closure {
    DayOff,
    DayDisabled,
    /// The service's weekday set or active window excludes the date.
    OfferingUnavailable,
    DateInPast,
}

/// Everything the engine needs for one (date, offering) computation.
#[derive(Debug, Clone, Copy)]
pub struct SlotRequest<'a> {
    pub day: &'a DaySchedule,
    pub calendar: &'a ExceptionCalendar,
    pub offering: &'a Offering,
    pub date: NaiveDate,
    /// Business-local current time.
    pub now: NaiveDateTime,
}

impl<'a> SlotRequest<'a> {
    /// Builds a request, picking the day schedule for `date`'s weekday.
    pub fn new(
        week: &'a WeeklySchedule,
        calendar: &'a ExceptionCalendar,
        offering: &'a Offering,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Self {
        SlotRequest {
            day: week.day(date.weekday()),
            calendar,
            offering,
            date,
            now,
        }
    }

    /// Returns the reason the whole date is unbookable, if any.
    pub fn closure(&self) -> Option<Closure> {
        if self.calendar.is_day_off(self.date) {
            Some(Closure::DayOff)
        } else if !self.day.enabled {
            Some(Closure::DayDisabled)
        } else if !self.offering.is_offered_on(self.date) {
            Some(Closure::OfferingUnavailable)
        } else if self.date < self.now.date() {
            Some(Closure::DateInPast)
        } else {
            None
        }
    }

    /// Booking length for this request.
    pub fn duration_minutes(&self) -> u32 {
        self.offering.duration_minutes(self.day)
    }
}

/// Start times that fit the schedule, in chronological order, ignoring capacity.
pub fn candidate_times(request: &SlotRequest<'_>) -> Vec<NaiveTime> {
    if request.closure().is_some() {
        return Vec::new();
    }

    let step = request.day.slot_duration_minutes;
    let duration = request.duration_minutes();
    if step == 0 || duration == 0 {
        return Vec::new();
    }

    let mut minutes: Vec<u32> = Vec::new();
    for window in request.day.windows() {
        let start = minutes_of(window.start);
        let end = minutes_of(window.end);
        let mut t = start;
        while t + duration <= end {
            minutes.push(t);
            t += step;
        }
    }
    minutes.sort_unstable();
    minutes.dedup();

    let is_today = request.date == request.now.date();
    minutes
        .into_iter()
        .filter_map(|m| NaiveTime::from_num_seconds_from_midnight_opt(m * 60, 0))
        .filter(|t| !is_today || *t > request.now.time())
        .collect()
}

/// Returns true if `time` is one of the request's candidate start times.
pub fn is_candidate(request: &SlotRequest<'_>, time: NaiveTime) -> bool {
    candidate_times(request).contains(&time)
}

/// Candidate slots annotated with occupancy and availability.
///
/// `occupancy` reports the number of pending + confirmed reservations
/// starting at a given time on `request.date`.
pub fn generate_slots<F>(request: &SlotRequest<'_>, policy: CapacityPolicy, mut occupancy: F) -> Vec<Slot>
where
    F: FnMut(NaiveTime) -> u32,
{
    candidate_times(request)
        .into_iter()
        .map(|time| {
            let occupied = occupancy(time);
            Slot {
                time,
                occupied,
                available: policy.has_room(occupied),
            }
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
