//! # Validation Module
//!
//! Input validation utilities for Slotwise.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Booking frontend                                             │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE + schedule/catalog validate()                    │
//! │  └── Business rule validation before anything is stored                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (durations > 0)                                 │
//! │  └── UNIQUE (business_id, date) on days off                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_PER_SLOT_LIMIT, MAX_SLOT_DURATION_MINUTES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a business display name (1-120 characters).
pub fn validate_business_name(name: &str) -> ValidationResult<()> {
    validate_required_text("business name", name, 120)
}

/// Validates a service name (1-120 characters).
///
/// ## Example
/// ```rust
/// use slotwise_core::validation::validate_service_name;
///
/// assert!(validate_service_name("Haircut").is_ok());
/// assert!(validate_service_name("  ").is_err());
/// ```
pub fn validate_service_name(name: &str) -> ValidationResult<()> {
    validate_required_text("service name", name, 120)
}

/// Validates the client's name on a reservation (1-100 characters).
pub fn validate_client_name(name: &str) -> ValidationResult<()> {
    validate_required_text("client name", name, 100)
}

/// Validates an email address.
///
/// ## Rules
/// - Exactly one `@` with a non-empty local part
/// - Domain contains a dot and no whitespace
/// - At most 254 characters
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    validate_required_text("email", email, 254)?;

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing @"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must contain exactly one @ after a local part"));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("domain must contain a dot"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    Ok(())
}

/// Validates a phone number.
///
/// ## Rules
/// - Digits, spaces, `+`, `-`, `(`, `)` only
/// - 6 to 15 digits
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    validate_required_text("phone", phone, 32)?;

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces, +, -, ( and )".to_string(),
        });
    }

    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !(6..=15).contains(&digits) {
        return Err(ValidationError::OutOfRange {
            field: "phone digits".to_string(),
            min: 6,
            max: 15,
        });
    }

    Ok(())
}

/// Validates free-text notes (optional, at most 500 characters).
pub fn validate_notes(notes: &str) -> ValidationResult<()> {
    if notes.chars().count() > 500 {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: 500,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free consultations)
///
/// ## Example
/// ```rust
/// use slotwise_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(2500).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a duration in minutes (service length or slot granularity).
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must fit in a day (<= MAX_SLOT_DURATION_MINUTES)
pub fn validate_duration_minutes(field: &str, minutes: u32) -> ValidationResult<()> {
    if minutes == 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if minutes > MAX_SLOT_DURATION_MINUTES {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: i64::from(MAX_SLOT_DURATION_MINUTES),
        });
    }

    Ok(())
}

/// Validates the per-slot capacity.
pub fn validate_max_per_slot(max: u32) -> ValidationResult<()> {
    if max == 0 || max > MAX_PER_SLOT_LIMIT {
        return Err(ValidationError::OutOfRange {
            field: "max per slot".to_string(),
            min: 1,
            max: i64::from(MAX_PER_SLOT_LIMIT),
        });
    }

    Ok(())
}

/// Validates a UTC offset in minutes (-14h .. +14h).
pub fn validate_utc_offset_minutes(offset: i32) -> ValidationResult<()> {
    if !(-14 * 60..=14 * 60).contains(&offset) {
        return Err(ValidationError::OutOfRange {
            field: "utc offset".to_string(),
            min: -14 * 60,
            max: 14 * 60,
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use slotwise_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
