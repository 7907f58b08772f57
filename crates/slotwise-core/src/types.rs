//! # Domain Types
//!
//! Core domain types used throughout Slotwise.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Business     │   │   Reservation   │   │      Slot       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  time           │       │
//! │  │  allow_multiple │   │  date + time    │   │  occupied       │       │
//! │  │  max_per_slot   │   │  status         │   │  available      │       │
//! │  │  utc_offset     │   │  contact        │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  Schedules, days off and services live in their own modules:           │
//! │  schedule.rs, calendar.rs, catalog.rs                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::capacity::CapacityPolicy;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation;

// =============================================================================
// Business
// =============================================================================

/// A business that publishes bookable hours.
///
/// Holds the per-business capacity policy and the UTC offset used to
/// compute the business-local "now".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Business {
    pub id: String,
    pub name: String,
    /// Whether more than one booking may share a slot.
    pub allow_multiple: bool,
    /// Maximum simultaneous bookings per slot (only meaningful with `allow_multiple`).
    pub max_per_slot: u32,
    /// Offset of business-local time from UTC, in minutes.
    pub utc_offset_minutes: i32,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Business {
    /// Returns the capacity policy configured for this business.
    pub fn capacity_policy(&self) -> CapacityPolicy {
        CapacityPolicy {
            allow_multiple: self.allow_multiple,
            max_per_slot: self.max_per_slot,
        }
    }
}

// =============================================================================
// Reservation Status
// =============================================================================

/// The lifecycle status of a reservation.
///
/// Only `Pending` and `Confirmed` hold capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Created by a client, awaiting owner confirmation.
    Pending,
    /// Accepted by the owner.
    Confirmed,
    /// Cancelled by the owner. Never counts toward capacity.
    Cancelled,
}

impl ReservationStatus {
    /// Returns true if a reservation in this status occupies its slot.
    #[inline]
    pub const fn holds_capacity(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }

    /// Returns true if the owner may move a reservation from `self` to `to`.
    pub const fn can_transition_to(&self, to: ReservationStatus) -> bool {
        matches!(
            (self, to),
            (ReservationStatus::Pending, ReservationStatus::Confirmed)
                | (ReservationStatus::Pending, ReservationStatus::Cancelled)
                | (ReservationStatus::Confirmed, ReservationStatus::Cancelled)
        )
    }

    /// Lowercase name as stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for ReservationStatus {
    fn default() -> Self {
        ReservationStatus::Pending
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Contact Info
// =============================================================================

/// Client contact details captured at booking time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ContactInfo {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl ContactInfo {
    /// Creates contact info with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        ContactInfo {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Trims every field; blank optional fields become `None`.
    pub fn normalized(&self) -> Self {
        fn trimmed(field: &Option<String>) -> Option<String> {
            field
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        ContactInfo {
            name: self.name.trim().to_string(),
            email: trimmed(&self.email),
            phone: trimmed(&self.phone),
            notes: trimmed(&self.notes),
        }
    }

    /// Validates every field, returning the first failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_client_name(&self.name)?;
        if self.email.is_none() && self.phone.is_none() {
            return Err(ValidationError::Required {
                field: "email or phone".to_string(),
            });
        }
        if let Some(email) = &self.email {
            validation::validate_email(email)?;
        }
        if let Some(phone) = &self.phone {
            validation::validate_phone(phone)?;
        }
        if let Some(notes) = &self.notes {
            validation::validate_notes(notes)?;
        }
        Ok(())
    }
}

// =============================================================================
// Reservation
// =============================================================================

/// A committed booking of one slot.
///
/// `date`, `time` and `duration_minutes` are frozen at creation; status
/// changes never move a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Reservation {
    pub id: String,
    pub business_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    /// Slot start time (business-local).
    #[ts(as = "String")]
    pub time: NaiveTime,
    pub duration_minutes: u32,
    /// None when booked against the implicit general service.
    pub service_id: Option<String>,
    pub status: ReservationStatus,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Returns the end of the booked interval.
    pub fn end_time(&self) -> NaiveTime {
        self.time + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Returns the reservation moved to `to`, if the lifecycle allows it.
    pub fn transition(&self, to: ReservationStatus, at: DateTime<Utc>) -> CoreResult<Reservation> {
        if !self.status.can_transition_to(to) {
            return Err(CoreError::InvalidStatusTransition {
                reservation_id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        Ok(Reservation {
            status: to,
            updated_at: at,
            ..self.clone()
        })
    }
}

// =============================================================================
// Slot
// =============================================================================

/// One candidate start time produced by the slot engine.
///
/// Advisory only: availability is re-checked when the reservation commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Slot {
    #[ts(as = "String")]
    pub time: NaiveTime,
    /// Pending + confirmed reservations already at this start time.
    pub occupied: u32,
    pub available: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================
