//! # Service Catalog
//!
//! Named offerings and the implicit general service.
//!
//! ## Offering Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Active services    Requested id     Result                             │
//! │  ───────────────    ────────────     ──────                             │
//! │  none               none             Offering::General                  │
//! │  none               some             ServiceNotFound                    │
//! │  some               matches active   Offering::Service(service)         │
//! │  some               unknown          ServiceNotFound                    │
//! │  some               none             ServiceRequired                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Offering::General` takes its duration from the day's slot granularity
//! and carries no weekday or date restriction of its own.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::schedule::{weekday_from_index, weekday_index, DaySchedule};
use crate::validation::{validate_duration_minutes, validate_price_cents, validate_service_name};

// =============================================================================
// Weekday Set
// =============================================================================

/// Subset of weekdays, stored as a 7-bit mask (bit 0 = Monday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<u8>", try_from = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    const ALL_BITS: u8 = 0b0111_1111;

    /// Every day of the week.
    pub const fn all() -> Self {
        WeekdaySet(Self::ALL_BITS)
    }

    /// No days.
    pub const fn empty() -> Self {
        WeekdaySet(0)
    }

    /// Builds a set from 0 = Monday .. 6 = Sunday indices.
    pub fn from_indices(indices: &[u8]) -> Result<Self, ValidationError> {
        let mut bits = 0u8;
        for &index in indices {
            weekday_from_index(index).map_err(|_| ValidationError::OutOfRange {
                field: "weekday".to_string(),
                min: 0,
                max: 6,
            })?;
            bits |= 1 << index;
        }
        Ok(WeekdaySet(bits))
    }

    /// Restores a set from its stored bitmask; stray high bits are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        WeekdaySet(bits & Self::ALL_BITS)
    }

    #[inline]
    pub const fn bits(&self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & (1 << weekday_index(weekday)) != 0
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Indices in ascending order.
    pub fn indices(&self) -> Vec<u8> {
        (0..7).filter(|i| self.0 & (1 << i) != 0).collect()
    }
}

impl Default for WeekdaySet {
    fn default() -> Self {
        WeekdaySet::all()
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.indices()
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = ValidationError;

    fn try_from(indices: Vec<u8>) -> Result<Self, Self::Error> {
        WeekdaySet::from_indices(&indices)
    }
}

// =============================================================================
// Service
// =============================================================================

/// A named, bookable offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Service {
    pub id: String,
    pub business_id: String,
    pub name: String,
    /// Length of one booking; also the slot length for this service.
    pub duration_minutes: u32,
    pub price_cents: i64,
    #[ts(as = "Vec<u8>")]
    pub available_weekdays: WeekdaySet,
    /// First bookable date (inclusive). None = open-ended.
    #[ts(as = "Option<String>")]
    pub active_from: Option<NaiveDate>,
    /// Last bookable date (inclusive). None = open-ended.
    #[ts(as = "Option<String>")]
    pub active_until: Option<NaiveDate>,
    /// Soft delete flag.
    pub is_active: bool,
}

impl Service {
    /// Checks the service's invariants before it is stored.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_service_name(&self.name)?;
        validate_duration_minutes("duration", self.duration_minutes)?;
        validate_price_cents(self.price_cents)?;
        if self.available_weekdays.is_empty() {
            return Err(ValidationError::Required {
                field: "available weekdays".to_string(),
            });
        }
        if let (Some(from), Some(until)) = (self.active_from, self.active_until) {
            if until < from {
                return Err(ValidationError::InvalidFormat {
                    field: "active window".to_string(),
                    reason: format!("ends ({until}) before it starts ({from})"),
                });
            }
        }
        Ok(())
    }

    /// Returns true if `date` lies inside the service's active window.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.active_from.map_or(true, |from| date >= from)
            && self.active_until.map_or(true, |until| date <= until)
    }

    /// Returns true if the service may be booked on `date`.
    pub fn is_bookable_on(&self, date: NaiveDate) -> bool {
        self.is_active && self.is_active_on(date) && self.available_weekdays.contains(date.weekday())
    }
}

// =============================================================================
// Offering
// =============================================================================

/// What a client is booking: a catalog service or the implicit general one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Offering {
    /// Used when the business has no active services.
    General,
    Service(Service),
}

impl Offering {
    /// Booking length on a given day.
    pub fn duration_minutes(&self, day: &DaySchedule) -> u32 {
        match self {
            Offering::General => day.slot_duration_minutes,
            Offering::Service(service) => service.duration_minutes,
        }
    }

    /// The offering's own date restriction (the day schedule is checked separately).
    pub fn is_offered_on(&self, date: NaiveDate) -> bool {
        match self {
            Offering::General => true,
            Offering::Service(service) => service.is_bookable_on(date),
        }
    }

    /// The catalog id, if this is a real service.
    pub fn service_id(&self) -> Option<&str> {
        match self {
            Offering::General => None,
            Offering::Service(service) => Some(service.id.as_str()),
        }
    }
}

// =============================================================================
// Service Catalog
// =============================================================================

/// The active services of one business.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCatalog {
    services: Vec<Service>,
}

impl ServiceCatalog {
    /// Builds a catalog, keeping only active services.
    pub fn new(services: Vec<Service>) -> Self {
        ServiceCatalog {
            services: services.into_iter().filter(|s| s.is_active).collect(),
        }
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// True when the general service applies.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn get(&self, service_id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == service_id)
    }

    /// Picks the offering for a booking request.
    pub fn resolve(&self, service_id: Option<&str>) -> CoreResult<Offering> {
        match (service_id, self.is_empty()) {
            (None, true) => Ok(Offering::General),
            (None, false) => Err(CoreError::ServiceRequired),
            (Some(id), _) => self
                .get(id)
                .cloned()
                .map(Offering::Service)
                .ok_or_else(|| CoreError::ServiceNotFound(id.to_string())),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
