//! # Error Types
//!
//! Domain-specific error types for slotwise-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  slotwise-core errors (this file)                                      │
//! │  ├── CoreError           - General domain errors                       │
//! │  ├── ConfigurationError  - Malformed schedule / calendar input         │
//! │  └── ValidationError     - Input validation failures                   │
//! │                                                                         │
//! │  slotwise-db errors (separate crate)                                   │
//! │  ├── DbError             - Database operation failures                 │
//! │  └── BookingError        - What a booking client sees                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → BookingError            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (weekday, ID, etc.)
//! 3. Errors are enum variants, never String
//! 4. "Nothing bookable" is NOT an error - it is an empty slot list

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::types::ReservationStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Schedule or calendar configuration is malformed.
    ///
    /// Rejected at save time; never reaches the slot engine.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The requested service does not exist or is not active.
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// The business offers services, so one must be chosen.
    #[error("A service must be selected for this business")]
    ServiceRequired,

    /// Reservation status change that the lifecycle does not allow.
    ///
    /// ## Allowed Transitions
    /// ```text
    /// pending ──► confirmed
    /// pending ──► cancelled
    /// confirmed ──► cancelled
    /// ```
    #[error("Reservation {reservation_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        reservation_id: String,
        from: ReservationStatus,
        to: ReservationStatus,
    },
}

// =============================================================================
// Configuration Error
// =============================================================================

/// Malformed owner configuration (weekly schedule, day-off ranges).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// An enabled day has no window with `end > start`.
    #[error("Day {weekday} is enabled but has no working window with end after start")]
    EmptyWindow { weekday: u8 },

    /// A window ends before it starts.
    #[error("Day {weekday}: window {start}-{end} ends before it starts")]
    InvertedWindow {
        weekday: u8,
        start: NaiveTime,
        end: NaiveTime,
    },

    /// Morning and afternoon windows overlap.
    #[error("Day {weekday}: morning window must end before the afternoon window starts")]
    OverlappingWindows { weekday: u8 },

    /// Slot granularity must be positive.
    #[error("Day {weekday}: slot duration must be greater than zero")]
    ZeroSlotDuration { weekday: u8 },

    /// Weekday index outside 0..=6.
    #[error("Invalid weekday index {0} (expected 0=Monday .. 6=Sunday)")]
    InvalidWeekday(u8),

    /// A weekly schedule must contain every weekday.
    #[error("Weekly schedule is missing weekday {0}")]
    MissingDay(u8),

    /// A weekly schedule may contain each weekday only once.
    #[error("Weekly schedule contains weekday {0} more than once")]
    DuplicateDay(u8),

    /// Date range ends before it starts.
    #[error("Date range {start}..{end} ends before it starts")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Date range is longer than allowed.
    #[error("Date range cannot exceed {max} days")]
    DateRangeTooLong { max: i64 },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
