//! # Repository Module
//!
//! Database repository implementations for Slotwise.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  BookingService                                                        │
//! │       │                                                                 │
//! │       │  db.schedules().get_day(id, weekday)                           │
//! │       │  db.days_off().calendar_between(id, date, date)                │
//! │       │  db.services().catalog(id)                                     │
//! │       │  db.reservations().insert_if_capacity(&r, max)                 │
//! │       ▼                                                                 │
//! │  One repository per table, each holding a pool clone                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`BusinessRepository`](business::BusinessRepository) - Businesses and capacity policy
//! - [`ScheduleRepository`](schedule::ScheduleRepository) - Weekly working hours
//! - [`DayOffRepository`](day_off::DayOffRepository) - Exception calendar
//! - [`ServiceRepository`](service::ServiceRepository) - Service catalog
//! - [`ReservationRepository`](reservation::ReservationRepository) - Capacity ledger

pub mod business;
pub mod day_off;
pub mod reservation;
pub mod schedule;
pub mod service;
