//! # Weekly Schedule
//!
//! Recurring per-weekday working hours.
//!
//! ## Shape of a Day
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Continuous                     Split                                   │
//! │  ──────────                     ─────                                   │
//! │  09:00 ─────────────── 18:00    09:00 ──── 13:00   16:00 ──── 20:00    │
//! │        one window                   morning            afternoon        │
//! │                                                                         │
//! │  slot_duration = grid step. Every slot of every service starts on this │
//! │  grid, measured from the window start.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Weekdays are indexed 0 = Monday .. 6 = Sunday.

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ConfigurationError;
use crate::DEFAULT_SLOT_DURATION_MINUTES;

/// Returns the 0 = Monday .. 6 = Sunday index of a weekday.
#[inline]
pub fn weekday_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_monday() as u8
}

/// Inverse of [`weekday_index`].
pub fn weekday_from_index(index: u8) -> Result<Weekday, ConfigurationError> {
    match index {
        0 => Ok(Weekday::Mon),
        1 => Ok(Weekday::Tue),
        2 => Ok(Weekday::Wed),
        3 => Ok(Weekday::Thu),
        4 => Ok(Weekday::Fri),
        5 => Ok(Weekday::Sat),
        6 => Ok(Weekday::Sun),
        other => Err(ConfigurationError::InvalidWeekday(other)),
    }
}

/// Minutes since midnight.
#[inline]
pub(crate) fn minutes_of(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight() / 60
}

// =============================================================================
// Time Window
// =============================================================================

/// A half-open working interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TimeWindow {
    #[ts(as = "String")]
    pub start: NaiveTime,
    #[ts(as = "String")]
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        TimeWindow { start, end }
    }

    /// Convenience constructor from hour/minute pairs.
    ///
    /// Returns `None` for out-of-range hours or minutes.
    pub fn from_hm(start: (u32, u32), end: (u32, u32)) -> Option<Self> {
        Some(TimeWindow {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0)?,
            end: NaiveTime::from_hms_opt(end.0, end.1, 0)?,
        })
    }

    /// True when the window has positive length.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.end > self.start
    }

    /// Window length in minutes (zero when degenerate or inverted).
    pub fn length_minutes(&self) -> u32 {
        minutes_of(self.end).saturating_sub(minutes_of(self.start))
    }
}

// =============================================================================
// Working Hours
// =============================================================================

/// The window layout of a working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkingHours {
    /// One uninterrupted window.
    Continuous { window: TimeWindow },
    /// A morning and an afternoon window with a break between them.
    Split {
        morning: TimeWindow,
        afternoon: TimeWindow,
    },
}

impl WorkingHours {
    /// Windows in chronological order (morning before afternoon).
    pub fn windows(&self) -> Vec<TimeWindow> {
        match self {
            WorkingHours::Continuous { window } => vec![*window],
            WorkingHours::Split { morning, afternoon } => vec![*morning, *afternoon],
        }
    }

    #[inline]
    pub fn is_continuous(&self) -> bool {
        matches!(self, WorkingHours::Continuous { .. })
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        WorkingHours::Continuous {
            window: TimeWindow {
                start: NaiveTime::MIN,
                end: NaiveTime::MIN,
            },
        }
    }
}

// =============================================================================
// Day Schedule
// =============================================================================

/// Working hours and slot granularity for one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DaySchedule {
    /// 0 = Monday .. 6 = Sunday.
    pub weekday: u8,
    pub enabled: bool,
    pub hours: WorkingHours,
    /// Grid step in minutes. Also the implicit general service's duration.
    pub slot_duration_minutes: u32,
}

impl DaySchedule {
    /// A closed day with the default granularity.
    pub fn closed(weekday: u8) -> Self {
        DaySchedule {
            weekday,
            enabled: false,
            hours: WorkingHours::default(),
            slot_duration_minutes: DEFAULT_SLOT_DURATION_MINUTES,
        }
    }

    /// An open day with a single window.
    pub fn continuous(weekday: u8, window: TimeWindow, slot_duration_minutes: u32) -> Self {
        DaySchedule {
            weekday,
            enabled: true,
            hours: WorkingHours::Continuous { window },
            slot_duration_minutes,
        }
    }

    /// An open day with a morning and an afternoon window.
    pub fn split(
        weekday: u8,
        morning: TimeWindow,
        afternoon: TimeWindow,
        slot_duration_minutes: u32,
    ) -> Self {
        DaySchedule {
            weekday,
            enabled: true,
            hours: WorkingHours::Split { morning, afternoon },
            slot_duration_minutes,
        }
    }

    /// Windows to walk when generating slots; empty for a disabled day.
    pub fn windows(&self) -> Vec<TimeWindow> {
        if self.enabled {
            self.hours.windows()
        } else {
            Vec::new()
        }
    }

    /// Checks the day's invariants.
    ///
    /// ## Rules
    /// - weekday in 0..=6
    /// - slot duration > 0 (even on closed days, it is stored)
    /// - enabled days: no inverted window, at least one window with
    ///   `end > start`, morning ends no later than afternoon starts
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.weekday > 6 {
            return Err(ConfigurationError::InvalidWeekday(self.weekday));
        }
        if self.slot_duration_minutes == 0 {
            return Err(ConfigurationError::ZeroSlotDuration {
                weekday: self.weekday,
            });
        }
        if !self.enabled {
            return Ok(());
        }

        let windows = self.hours.windows();
        for w in &windows {
            if w.end < w.start {
                return Err(ConfigurationError::InvertedWindow {
                    weekday: self.weekday,
                    start: w.start,
                    end: w.end,
                });
            }
        }
        if !windows.iter().any(TimeWindow::is_open) {
            return Err(ConfigurationError::EmptyWindow {
                weekday: self.weekday,
            });
        }
        if let WorkingHours::Split { morning, afternoon } = self.hours {
            if morning.is_open() && afternoon.is_open() && morning.end > afternoon.start {
                return Err(ConfigurationError::OverlappingWindows {
                    weekday: self.weekday,
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Weekly Schedule
// =============================================================================

/// All seven day schedules of a business, indexed by weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WeeklySchedule {
    days: [DaySchedule; 7],
}

impl WeeklySchedule {
    /// Builds a schedule from exactly one entry per weekday, validating each.
    pub fn from_days(days: Vec<DaySchedule>) -> Result<Self, ConfigurationError> {
        let mut slots: [Option<DaySchedule>; 7] = [None; 7];
        for day in days {
            day.validate()?;
            let entry = &mut slots[usize::from(day.weekday)];
            if entry.is_some() {
                return Err(ConfigurationError::DuplicateDay(day.weekday));
            }
            *entry = Some(day);
        }

        let mut out = [DaySchedule::closed(0); 7];
        for (index, slot) in slots.into_iter().enumerate() {
            out[index] = slot.ok_or(ConfigurationError::MissingDay(index as u8))?;
        }
        Ok(WeeklySchedule { days: out })
    }

    /// Builds a schedule from whatever rows exist; missing weekdays are closed.
    ///
    /// Used on the read side, where a business may not have saved yet.
    pub fn from_partial(days: Vec<DaySchedule>) -> Self {
        let mut out: [DaySchedule; 7] = std::array::from_fn(|i| DaySchedule::closed(i as u8));
        for day in days {
            if let Some(entry) = out.get_mut(usize::from(day.weekday)) {
                *entry = day;
            }
        }
        WeeklySchedule { days: out }
    }

    /// A week with every day closed.
    pub fn all_closed() -> Self {
        WeeklySchedule::from_partial(Vec::new())
    }

    /// The schedule for a weekday.
    pub fn day(&self, weekday: Weekday) -> &DaySchedule {
        &self.days[usize::from(weekday_index(weekday))]
    }

    /// All seven days, Monday first.
    pub fn days(&self) -> &[DaySchedule; 7] {
        &self.days
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
