//! # Clock
//!
//! "Now" is an input, never an ambient read inside the slot engine.
//! Callers hold a `Clock` and pass the business-local time down explicitly,
//! so tests can pin it with [`FixedClock`].

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Wall-clock time at a business `utc_offset_minutes` away from UTC.
    fn local_now(&self, utc_offset_minutes: i32) -> NaiveDateTime {
        self.now_utc().naive_utc() + Duration::minutes(i64::from(utc_offset_minutes))
    }
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// A clock pinned to a business-local wall time at the given offset.
    pub fn at_local(local: NaiveDateTime, utc_offset_minutes: i32) -> Self {
        let utc = local - Duration::minutes(i64::from(utc_offset_minutes));
        FixedClock(utc.and_utc())
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}
