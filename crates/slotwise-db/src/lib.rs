//! # slotwise-db: Database Layer and Reservation Protocol for Slotwise
//!
//! SQLite persistence (via sqlx) for businesses, schedules, days off,
//! services and reservations, plus the [`BookingService`] that lists slots
//! and commits reservations without ever overfilling a slot.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Slotwise Data Flow                               │
//! │                                                                         │
//! │  Caller (HTTP handler, UI command, CLI)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  slotwise-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ BookingService│    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (booking.rs)  │    │ business      │    │  (embedded)  │  │   │
//! │  │   │               │───►│ schedule      │    │ 001_init.sql │  │   │
//! │  │   │ SlotLocks     │    │ day_off       │    │              │  │   │
//! │  │   │ Notifier      │    │ service       │    │              │  │   │
//! │  │   │ Clock         │    │ reservation   │    │              │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │ slotwise-core      │ Database (pool.rs)           │   │
//! │  │           ▼ engine             ▼                               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per table
//! - [`booking`] - Slot listing and reservation commit
//! - [`locks`] - In-process per-slot mutexes
//! - [`notifier`] - Post-commit notification hook
//! - [`config`] - TOML + environment configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use slotwise_db::{BookingService, Database, ReservationRequest, SlotwiseConfig};
//!
//! let config = SlotwiseConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let booking = BookingService::from_settings(db, &config.booking);
//!
//! let slots = booking.get_available_slots(&business_id, date, None).await?;
//! let reservation = booking
//!     .reserve(ReservationRequest::new(&business_id, date, slots[0].time, contact))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod booking;
pub mod config;
pub mod error;
pub mod locks;
pub mod migrations;
pub mod notifier;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use booking::{BookingError, BookingResult, BookingService, ReservationRequest};
pub use config::{ConfigError, SlotwiseConfig};
pub use error::{DbError, DbResult};
pub use notifier::{LoggingNotifier, NoopNotifier, NotifyError, ReservationNotice, ReservationNotifier};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::business::BusinessRepository;
pub use repository::day_off::DayOffRepository;
pub use repository::reservation::ReservationRepository;
pub use repository::schedule::ScheduleRepository;
pub use repository::service::ServiceRepository;
