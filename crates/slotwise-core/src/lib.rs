//! # slotwise-core: Pure Booking Logic for Slotwise
//!
//! This crate is the **heart** of Slotwise. It decides which appointment
//! slots a business can offer on a given date, as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Slotwise Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Surrounding application (HTTP / UI)                │   │
//! │  │     pick date ──► list slots ──► pick slot ──► reserve          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ slotwise-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ schedule  │  │ calendar  │  │  catalog  │  │  engine   │  │   │
//! │  │   │  weekly   │  │  days off │  │ services  │  │   slots   │  │   │
//! │  │   │  hours    │  │  ranges   │  │ offering  │  │ capacity  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • "NOW" IS AN ARGUMENT      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              slotwise-db (Database Layer)                       │   │
//! │  │     SQLite repositories, capacity ledger, reservation commit    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Business, Reservation, Slot
//! - [`schedule`] - Weekly working hours
//! - [`calendar`] - Days off and derived ranges
//! - [`catalog`] - Services and the implicit general offering
//! - [`capacity`] - Per-slot capacity policy
//! - [`engine`] - Slot generation
//! - [`clock`] - Injected "now"
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use slotwise_core::engine::{generate_slots, SlotRequest};
//! use slotwise_core::schedule::{DaySchedule, TimeWindow, WeeklySchedule};
//! use slotwise_core::{CapacityPolicy, ExceptionCalendar, Offering};
//!
//! let monday = DaySchedule::split(
//!     0,
//!     TimeWindow::from_hm((9, 0), (13, 0)).unwrap(),
//!     TimeWindow::from_hm((16, 0), (20, 0)).unwrap(),
//!     30,
//! );
//! let week = WeeklySchedule::from_partial(vec![monday]);
//! let calendar = ExceptionCalendar::new();
//!
//! let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(); // a Monday
//! let now = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap().and_hms_opt(12, 0, 0).unwrap();
//!
//! let request = SlotRequest::new(&week, &calendar, &Offering::General, date, now);
//! let slots = generate_slots(&request, CapacityPolicy::single(), |_| 0);
//! assert_eq!(slots.len(), 16);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calendar;
pub mod capacity;
pub mod catalog;
pub mod clock;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use calendar::{DayOff, DayOffRange, ExceptionCalendar};
pub use capacity::CapacityPolicy;
pub use catalog::{Offering, Service, ServiceCatalog, WeekdaySet};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ConfigurationError, CoreError, CoreResult, ValidationError};
pub use schedule::{DaySchedule, TimeWindow, WeeklySchedule, WorkingHours};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Slot granularity given to days that have never been configured.
pub const DEFAULT_SLOT_DURATION_MINUTES: u32 = 30;

/// Longest service or slot duration: one full day.
pub const MAX_SLOT_DURATION_MINUTES: u32 = 24 * 60;

/// Upper bound for `max_per_slot`.
///
/// ## Business Reason
/// Guards against typos (300 instead of 3) in the owner settings.
pub const MAX_PER_SLOT_LIMIT: u32 = 100;

/// Longest day-off range accepted in one insert.
pub const MAX_DAY_OFF_RANGE_DAYS: i64 = 366;
