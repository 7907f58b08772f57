//! # Booking Service
//!
//! Slot listing and the reservation commit protocol.
//!
//! ## Reserve Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve(request)                                                       │
//! │       │                                                                 │
//! │       ├── contact or request_id invalid ───────► InvalidRequest        │
//! │       ├── request_id already stored ───────────► Ok(existing)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load business, week, days off, catalog; now = clock(offset)           │
//! │       ├── time not on today's candidate grid ──► SlotNotOffered        │
//! │       │                                                                 │
//! │       ▼          ┌──────── bounded by reserve_timeout ────────┐        │
//! │  lock(business, date, time) ─► INSERT .. SELECT .. WHERE count < max  │
//! │       │          └────────────────────────────────────────────┘        │
//! │       ├── rows_affected = 0 ───────────────────► SlotNoLongerAvailable │
//! │       ├── timeout, row found ──────────────────► Ok(reservation)       │
//! │       ├── timeout, row absent ─────────────────► Indeterminate         │
//! │       ├── I/O error, row found ────────────────► Ok(reservation)       │
//! │       ├── I/O error, row absent ───────────────► PersistenceUnavailable│
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  spawn notifier (errors logged) ───────────────► Ok(reservation)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A slot listing is advisory. The conditional insert is the only place
//! capacity is decided, so two clients holding the same listing can never
//! both overfill a slot.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use slotwise_core::engine::{generate_slots, is_candidate, SlotRequest};
use slotwise_core::validation::validate_uuid;
use slotwise_core::{
    Business, Clock, ConfigurationError, ContactInfo, CoreError, ExceptionCalendar, Offering,
    Reservation, ReservationStatus, Slot, SystemClock, ValidationError, WeeklySchedule,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::BookingSettings;
use crate::error::DbError;
use crate::locks::{SlotKey, SlotLocks};
use crate::notifier::{LoggingNotifier, NoopNotifier, ReservationNotice, ReservationNotifier};
use crate::pool::Database;

/// Default bound on the commit step of a reservation.
pub const DEFAULT_RESERVE_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Errors
// =============================================================================

/// What a booking client can act on.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Someone else took the last place. Pick another slot.
    #[error("Slot {date} {time} is no longer available")]
    SlotNoLongerAvailable { date: NaiveDate, time: NaiveTime },

    /// The time is not on the bookable grid for that date right now.
    #[error("Slot {date} {time} is not offered")]
    SlotNotOffered { date: NaiveDate, time: NaiveTime },

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("A service must be selected for this business")]
    ServiceRequired,

    #[error("Business not found: {0}")]
    BusinessNotFound(String),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("Cannot move reservation {reservation_id} from {from} to {to}")]
    InvalidStatusTransition {
        reservation_id: String,
        from: ReservationStatus,
        to: ReservationStatus,
    },

    /// Storage failed before anything was written. Safe to retry.
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// The commit did not finish in time and its outcome is unknown.
    /// Retrying with the same `request_id` either returns the stored
    /// reservation or books it.
    #[error("Outcome of reservation {reservation_id} is unknown; retry with the same request id")]
    Indeterminate { reservation_id: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Database(DbError),
}

impl BookingError {
    /// True when repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BookingError::PersistenceUnavailable(_) | BookingError::Indeterminate { .. }
        )
    }
}

impl From<CoreError> for BookingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Configuration(e) => BookingError::Configuration(e),
            CoreError::Validation(e) => BookingError::InvalidRequest(e),
            CoreError::ServiceNotFound(id) => BookingError::ServiceNotFound(id),
            CoreError::ServiceRequired => BookingError::ServiceRequired,
            CoreError::InvalidStatusTransition {
                reservation_id,
                from,
                to,
            } => BookingError::InvalidStatusTransition {
                reservation_id,
                from,
                to,
            },
        }
    }
}

impl From<DbError> for BookingError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(core) => core.into(),
            e if e.is_unavailable() => BookingError::PersistenceUnavailable(e.to_string()),
            e => BookingError::Database(e),
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;

// =============================================================================
// Request
// =============================================================================

/// A client's request for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    pub business_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Required when the business has active services.
    pub service_id: Option<String>,
    pub contact: ContactInfo,
    /// Idempotency key (a UUID); becomes the reservation id.
    pub request_id: Option<String>,
}

impl ReservationRequest {
    pub fn new(business_id: impl Into<String>, date: NaiveDate, time: NaiveTime, contact: ContactInfo) -> Self {
        ReservationRequest {
            business_id: business_id.into(),
            date,
            time,
            service_id: None,
            contact,
            request_id: None,
        }
    }

    pub fn with_service(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Everything loaded for one (business, date, offering).
struct BookingContext {
    business: Business,
    week: WeeklySchedule,
    calendar: ExceptionCalendar,
    offering: Offering,
    now: NaiveDateTime,
}

impl BookingContext {
    fn slot_request(&self, date: NaiveDate) -> SlotRequest<'_> {
        SlotRequest::new(&self.week, &self.calendar, &self.offering, date, self.now)
    }
}

// =============================================================================
// Service
// =============================================================================

/// Entry point for listing slots and managing reservations.
///
/// ## Usage
/// ```rust,ignore
/// let booking = BookingService::new(db.clone())
///     .with_notifier(Arc::new(LoggingNotifier));
///
/// let slots = booking.get_available_slots(&business_id, date, None).await?;
/// let reservation = booking
///     .reserve(ReservationRequest::new(&business_id, date, slots[0].time, contact))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct BookingService {
    db: Database,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn ReservationNotifier>,
    locks: SlotLocks,
    reserve_timeout: Duration,
}

impl BookingService {
    /// System clock, no-op notifier, default timeout.
    pub fn new(db: Database) -> Self {
        BookingService {
            db,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(NoopNotifier),
            locks: SlotLocks::new(),
            reserve_timeout: DEFAULT_RESERVE_TIMEOUT,
        }
    }

    /// Builds a service from the `[booking]` config section.
    pub fn from_settings(db: Database, settings: &BookingSettings) -> Self {
        let service = BookingService::new(db).with_reserve_timeout(settings.reserve_timeout());
        if settings.log_notifications {
            service.with_notifier(Arc::new(LoggingNotifier))
        } else {
            service
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ReservationNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_reserve_timeout(mut self, timeout: Duration) -> Self {
        self.reserve_timeout = timeout;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Bookable slots on `date`, chronologically, with occupancy.
    ///
    /// Closed days, days off, past dates and offerings not sold on that
    /// date all return an empty list.
    pub async fn get_available_slots(
        &self,
        business_id: &str,
        date: NaiveDate,
        service_id: Option<&str>,
    ) -> BookingResult<Vec<Slot>> {
        let ctx = self.load_context(business_id, date, service_id).await?;
        let request = ctx.slot_request(date);

        if let Some(closure) = request.closure() {
            debug!(business_id = %business_id, %date, ?closure, "No slots for date");
            return Ok(Vec::new());
        }

        let occupancy = self.db.reservations().occupancy_by_time(business_id, date).await?;
        let slots = generate_slots(&request, ctx.business.capacity_policy(), |time| {
            occupancy.get(&time).copied().unwrap_or(0)
        });

        debug!(
            business_id = %business_id,
            %date,
            slots = slots.len(),
            available = slots.iter().filter(|s| s.available).count(),
            "Slots generated"
        );
        Ok(slots)
    }

    // =========================================================================
    // Reserve
    // =========================================================================

    /// Books one place in a slot, or fails without writing anything.
    pub async fn reserve(&self, request: ReservationRequest) -> BookingResult<Reservation> {
        let contact = request.contact.normalized();
        contact.validate()?;

        let reservation_id = match request.request_id.as_deref().map(str::trim) {
            Some("") => {
                return Err(BookingError::InvalidRequest(ValidationError::Required {
                    field: "request id".to_string(),
                }))
            }
            Some(id) => {
                validate_uuid(id)?;
                if let Some(existing) = self.db.reservations().get_by_id(id).await? {
                    return replay(existing, &request);
                }
                id.to_string()
            }
            None => Uuid::new_v4().to_string(),
        };

        let ctx = self
            .load_context(&request.business_id, request.date, request.service_id.as_deref())
            .await?;
        let slot_request = ctx.slot_request(request.date);

        if !is_candidate(&slot_request, request.time) {
            debug!(
                business_id = %request.business_id,
                date = %request.date,
                time = %request.time,
                "Requested time not on the grid"
            );
            return Err(BookingError::SlotNotOffered {
                date: request.date,
                time: request.time,
            });
        }

        let now = self.clock.now_utc();
        let reservation = Reservation {
            id: reservation_id,
            business_id: request.business_id,
            date: request.date,
            time: request.time,
            duration_minutes: slot_request.duration_minutes(),
            service_id: ctx.offering.service_id().map(str::to_string),
            status: ReservationStatus::Pending,
            client_name: contact.name,
            client_email: contact.email,
            client_phone: contact.phone,
            notes: contact.notes,
            created_at: now,
            updated_at: now,
        };
        let max_per_slot = ctx.business.capacity_policy().effective_max();

        let committed = self.commit(reservation, max_per_slot).await?;
        self.dispatch_notice(&committed);
        Ok(committed)
    }

    /// Lock, recheck and insert, bounded by `reserve_timeout`.
    async fn commit(&self, reservation: Reservation, max_per_slot: u32) -> BookingResult<Reservation> {
        let key = SlotKey::new(&reservation.business_id, reservation.date, reservation.time);
        let reservations = self.db.reservations();

        let attempt = async {
            let _guard = self.locks.acquire(key).await;
            reservations.insert_if_capacity(&reservation, max_per_slot).await
        };

        let outcome = tokio::time::timeout(self.reserve_timeout, attempt).await;

        match outcome {
            Ok(Ok(true)) => {
                info!(
                    reservation_id = %reservation.id,
                    business_id = %reservation.business_id,
                    date = %reservation.date,
                    time = %reservation.time,
                    "Reservation committed"
                );
                Ok(reservation)
            }
            Ok(Ok(false)) => {
                debug!(
                    business_id = %reservation.business_id,
                    date = %reservation.date,
                    time = %reservation.time,
                    max_per_slot,
                    "Slot full"
                );
                Err(BookingError::SlotNoLongerAvailable {
                    date: reservation.date,
                    time: reservation.time,
                })
            }
            // A concurrent retry with the same key won the insert.
            Ok(Err(DbError::UniqueViolation { .. })) => {
                match reservations.get_by_id(&reservation.id).await? {
                    Some(existing) => Ok(existing),
                    None => Err(BookingError::Indeterminate {
                        reservation_id: reservation.id,
                    }),
                }
            }
            Ok(Err(e)) if e.is_outcome_unknown() => self.resolve_failed_write(reservation.id, e).await,
            Ok(Err(e)) => Err(e.into()),
            Err(_) => self.resolve_timeout(reservation.id).await,
        }
    }

    /// The insert failed in a way that does not rule out a write.
    async fn resolve_failed_write(&self, reservation_id: String, cause: DbError) -> BookingResult<Reservation> {
        let lookup = tokio::time::timeout(
            self.reserve_timeout,
            self.db.reservations().get_by_id(&reservation_id),
        )
        .await;

        match lookup {
            Ok(Ok(Some(reservation))) => {
                info!(reservation_id = %reservation_id, error = %cause, "Reservation committed despite write error");
                Ok(reservation)
            }
            Ok(Ok(None)) => {
                warn!(reservation_id = %reservation_id, error = %cause, "Reservation not written");
                Err(BookingError::PersistenceUnavailable(cause.to_string()))
            }
            Ok(Err(lookup_err)) => {
                warn!(
                    reservation_id = %reservation_id,
                    error = %cause,
                    lookup_error = %lookup_err,
                    "Reservation outcome unknown after write error"
                );
                Err(BookingError::Indeterminate { reservation_id })
            }
            Err(_) => {
                warn!(reservation_id = %reservation_id, error = %cause, "Lookup timed out after write error");
                Err(BookingError::Indeterminate { reservation_id })
            }
        }
    }

    /// After a timeout the insert may or may not have landed.
    async fn resolve_timeout(&self, reservation_id: String) -> BookingResult<Reservation> {
        let lookup = tokio::time::timeout(
            self.reserve_timeout,
            self.db.reservations().get_by_id(&reservation_id),
        )
        .await;

        match lookup {
            Ok(Ok(Some(reservation))) => {
                info!(reservation_id = %reservation_id, "Reservation committed before timeout fired");
                Ok(reservation)
            }
            Ok(Err(err)) => {
                warn!(
                    reservation_id = %reservation_id,
                    timeout_ms = self.reserve_timeout.as_millis() as u64,
                    error = %err,
                    "Reservation outcome unknown after timeout; lookup failed"
                );
                Err(BookingError::Indeterminate { reservation_id })
            }
            Ok(Ok(None)) | Err(_) => {
                warn!(
                    reservation_id = %reservation_id,
                    timeout_ms = self.reserve_timeout.as_millis() as u64,
                    "Reservation outcome unknown after timeout"
                );
                Err(BookingError::Indeterminate { reservation_id })
            }
        }
    }

    fn dispatch_notice(&self, reservation: &Reservation) {
        let notifier = Arc::clone(&self.notifier);
        let notice = ReservationNotice::from(reservation);
        tokio::spawn(async move {
            if let Err(err) = notifier.notify(&notice).await {
                warn!(
                    reservation_id = %notice.reservation_id,
                    error = %err,
                    "Reservation notification failed"
                );
            }
        });
    }

    // =========================================================================
    // Owner Operations
    // =========================================================================

    /// Pending → Confirmed.
    pub async fn confirm(&self, reservation_id: &str) -> BookingResult<Reservation> {
        self.transition(reservation_id, ReservationStatus::Confirmed).await
    }

    /// Pending or Confirmed → Cancelled. Frees the slot immediately.
    pub async fn cancel(&self, reservation_id: &str) -> BookingResult<Reservation> {
        self.transition(reservation_id, ReservationStatus::Cancelled).await
    }

    async fn transition(&self, reservation_id: &str, to: ReservationStatus) -> BookingResult<Reservation> {
        let reservations = self.db.reservations();
        let current = reservations
            .get_by_id(reservation_id)
            .await?
            .ok_or_else(|| BookingError::ReservationNotFound(reservation_id.to_string()))?;

        // Repeating an owner action is a no-op.
        if current.status == to {
            return Ok(current);
        }

        let next = current.transition(to, self.clock.now_utc())?;
        if reservations
            .update_status(&current.id, current.status, to, next.updated_at)
            .await?
        {
            info!(reservation_id = %reservation_id, from = %current.status, %to, "Reservation status changed");
            return Ok(next);
        }

        // Lost a race with another owner action; report against the fresh row.
        let fresh = reservations
            .get_by_id(reservation_id)
            .await?
            .ok_or_else(|| BookingError::ReservationNotFound(reservation_id.to_string()))?;
        if fresh.status == to {
            Ok(fresh)
        } else {
            Err(BookingError::InvalidStatusTransition {
                reservation_id: fresh.id,
                from: fresh.status,
                to,
            })
        }
    }

    // =========================================================================
    // Context
    // =========================================================================

    async fn load_context(
        &self,
        business_id: &str,
        date: NaiveDate,
        service_id: Option<&str>,
    ) -> BookingResult<BookingContext> {
        let business = self
            .db
            .businesses()
            .get_by_id(business_id)
            .await?
            .ok_or_else(|| BookingError::BusinessNotFound(business_id.to_string()))?;

        let week = self.db.schedules().get_week(business_id).await?;
        let calendar = self.db.days_off().calendar_between(business_id, date, date).await?;
        let offering = self.db.services().catalog(business_id).await?.resolve(service_id)?;
        let now = self.clock.local_now(business.utc_offset_minutes);

        Ok(BookingContext {
            business,
            week,
            calendar,
            offering,
            now,
        })
    }
}

/// A stored reservation under the same idempotency key.
fn replay(existing: Reservation, request: &ReservationRequest) -> BookingResult<Reservation> {
    if existing.business_id == request.business_id
        && existing.date == request.date
        && existing.time == request.time
    {
        debug!(reservation_id = %existing.id, "Idempotent replay of reservation");
        Ok(existing)
    } else {
        Err(BookingError::Database(DbError::duplicate("request id", &existing.id)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::NotifyError;
    use crate::pool::DbConfig;
    use async_trait::async_trait;
    use slotwise_core::{CapacityPolicy, DaySchedule, FixedClock, Service, TimeWindow, WeekdaySet};
    use tokio::sync::mpsc;

    // -------------------------------------------------------------------------
    // Fixtures
    // -------------------------------------------------------------------------

    /// Monday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn clock_at(h: u32, m: u32) -> Arc<dyn Clock> {
        Arc::new(FixedClock::at_local(today().and_time(at(h, m)), 60))
    }

    fn contact() -> ContactInfo {
        ContactInfo {
            email: Some("ana@example.com".to_string()),
            ..ContactInfo::named("Ana")
        }
    }

    fn split_week() -> Vec<DaySchedule> {
        let morning = TimeWindow::from_hm((9, 0), (13, 0)).unwrap();
        let afternoon = TimeWindow::from_hm((16, 0), (20, 0)).unwrap();
        (0..7u8)
            .map(|w| {
                if w < 5 {
                    DaySchedule::split(w, morning, afternoon, 30)
                } else {
                    DaySchedule::closed(w)
                }
            })
            .collect()
    }

    async fn seeded(db: Database, policy: CapacityPolicy) -> (BookingService, String) {
        let business = db.businesses().create("Studio", policy, 60).await.unwrap();
        db.schedules().save_week(&business.id, split_week()).await.unwrap();
        let service = BookingService::new(db).with_clock(clock_at(8, 0));
        (service, business.id)
    }

    async fn setup(policy: CapacityPolicy) -> (BookingService, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seeded(db, policy).await
    }

    #[derive(Debug)]
    struct ChannelNotifier(mpsc::UnboundedSender<ReservationNotice>);

    #[async_trait]
    impl ReservationNotifier for ChannelNotifier {
        async fn notify(&self, notice: &ReservationNotice) -> Result<(), NotifyError> {
            self.0
                .send(notice.clone())
                .map_err(|e| NotifyError::Delivery(e.to_string()))
        }
    }

    #[derive(Debug)]
    struct FailingNotifier;

    #[async_trait]
    impl ReservationNotifier for FailingNotifier {
        async fn notify(&self, _notice: &ReservationNotice) -> Result<(), NotifyError> {
            Err(NotifyError::Delivery("smtp down".to_string()))
        }
    }

    // -------------------------------------------------------------------------
    // Listing
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_split_day_lists_sixteen_slots() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;
        let slots = booking.get_available_slots(&business_id, today(), None).await.unwrap();

        assert_eq!(slots.len(), 16);
        assert_eq!(slots.first().unwrap().time, at(9, 0));
        assert_eq!(slots.last().unwrap().time, at(19, 30));
        assert!(slots.iter().all(|s| s.available && s.occupied == 0));
        assert!(slots.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[tokio::test]
    async fn test_today_drops_past_slots() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;
        let booking = booking.with_clock(clock_at(14, 10));

        let slots = booking.get_available_slots(&business_id, today(), None).await.unwrap();
        assert!(slots.iter().all(|s| s.time > at(14, 10)));
        assert_eq!(slots.first().unwrap().time, at(16, 0));
        assert_eq!(slots.len(), 8);
    }

    #[tokio::test]
    async fn test_closed_day_and_day_off_are_empty() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;

        let saturday = NaiveDate::from_ymd_opt(2026, 10, 24).unwrap();
        assert!(booking.get_available_slots(&business_id, saturday, None).await.unwrap().is_empty());

        let tuesday = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        booking
            .database()
            .days_off()
            .add(&business_id, tuesday, Some("Inventory"))
            .await
            .unwrap();
        assert!(booking.get_available_slots(&business_id, tuesday, None).await.unwrap().is_empty());

        let past = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert!(booking.get_available_slots(&business_id, past, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_is_idempotent() {
        let (booking, business_id) = setup(CapacityPolicy::multiple(2).unwrap()).await;
        booking
            .reserve(ReservationRequest::new(&business_id, today(), at(9, 30), contact()))
            .await
            .unwrap();

        let first = booking.get_available_slots(&business_id, today(), None).await.unwrap();
        let second = booking.get_available_slots(&business_id, today(), None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_weekend_service_has_no_weekday_slots() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;
        let db = booking.database().clone();

        let mut week = split_week();
        week[5] = DaySchedule::continuous(5, TimeWindow::from_hm((10, 0), (14, 0)).unwrap(), 30);
        db.schedules().save_week(&business_id, week).await.unwrap();

        let brunch = db
            .services()
            .create(&Service {
                id: String::new(),
                business_id: business_id.clone(),
                name: "Brunch tasting".to_string(),
                duration_minutes: 60,
                price_cents: 4500,
                available_weekdays: WeekdaySet::from_indices(&[5, 6]).unwrap(),
                active_from: None,
                active_until: None,
                is_active: true,
            })
            .await
            .unwrap();

        let friday = NaiveDate::from_ymd_opt(2026, 10, 23).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2026, 10, 24).unwrap();

        let weekday = booking
            .get_available_slots(&business_id, friday, Some(&brunch.id))
            .await
            .unwrap();
        assert!(weekday.is_empty());

        let weekend = booking
            .get_available_slots(&business_id, saturday, Some(&brunch.id))
            .await
            .unwrap();
        // 10:00..13:00 every 30 minutes, each fitting 60 minutes before 14:00
        assert_eq!(weekend.len(), 7);

        let err = booking
            .get_available_slots(&business_id, saturday, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::ServiceRequired));
    }

    #[tokio::test]
    async fn test_unknown_business_and_service() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;

        let err = booking.get_available_slots("nope", today(), None).await.unwrap_err();
        assert!(matches!(err, BookingError::BusinessNotFound(_)));

        let err = booking
            .get_available_slots(&business_id, today(), Some("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::ServiceNotFound(_)));
    }

    // -------------------------------------------------------------------------
    // Reserve
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_single_capacity_slot_fills() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;

        let reservation = booking
            .reserve(ReservationRequest::new(&business_id, today(), at(10, 0), contact()))
            .await
            .unwrap();
        assert_eq!(reservation.status, ReservationStatus::Pending);
        assert_eq!(reservation.duration_minutes, 30);
        assert_eq!(reservation.service_id, None);

        let slots = booking.get_available_slots(&business_id, today(), None).await.unwrap();
        let ten = slots.iter().find(|s| s.time == at(10, 0)).unwrap();
        assert_eq!(ten.occupied, 1);
        assert!(!ten.available);

        let err = booking
            .reserve(ReservationRequest::new(&business_id, today(), at(10, 0), contact()))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::SlotNoLongerAvailable { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_multiple_capacity_fills_after_third() {
        let (booking, business_id) = setup(CapacityPolicy::multiple(3).unwrap()).await;

        for expected in 1..=3u32 {
            booking
                .reserve(ReservationRequest::new(&business_id, today(), at(16, 30), contact()))
                .await
                .unwrap();
            let slots = booking.get_available_slots(&business_id, today(), None).await.unwrap();
            let slot = slots.iter().find(|s| s.time == at(16, 30)).unwrap();
            assert_eq!(slot.occupied, expected);
            assert_eq!(slot.available, expected < 3);
        }
    }

    #[tokio::test]
    async fn test_off_grid_time_rejected() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;

        for time in [at(9, 15), at(13, 0), at(14, 0), at(7, 0)] {
            let err = booking
                .reserve(ReservationRequest::new(&business_id, today(), time, contact()))
                .await
                .unwrap_err();
            assert!(matches!(err, BookingError::SlotNotOffered { .. }), "{time}");
        }

        let late = booking.clone().with_clock(clock_at(14, 10));
        let err = late
            .reserve(ReservationRequest::new(&business_id, today(), at(10, 0), contact()))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::SlotNotOffered { .. }));
        assert!(booking.database().reservations().list_for_date(&business_id, today()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_contact_rejected() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;
        let err = booking
            .reserve(ReservationRequest::new(&business_id, today(), at(9, 0), ContactInfo::named("Ana")))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_request_id_must_be_uuid() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;
        let err = booking
            .reserve(ReservationRequest::new(&business_id, today(), at(9, 0), contact()).with_request_id("retry-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidRequest(ValidationError::InvalidFormat { .. })));
    }

    #[tokio::test]
    async fn test_contact_is_stored_trimmed() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;
        let raw = ContactInfo {
            name: " Ana ".to_string(),
            email: Some("  ana@example.com ".to_string()),
            phone: Some(" +34 600 000 000 ".to_string()),
            notes: Some("   ".to_string()),
        };

        let reservation = booking
            .reserve(ReservationRequest::new(&business_id, today(), at(9, 0), raw))
            .await
            .unwrap();
        let stored = booking
            .database()
            .reservations()
            .get_by_id(&reservation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.client_name, "Ana");
        assert_eq!(stored.client_email.as_deref(), Some("ana@example.com"));
        assert_eq!(stored.client_phone.as_deref(), Some("+34 600 000 000"));
        assert_eq!(stored.notes, None);
    }

    #[tokio::test]
    async fn test_request_id_is_idempotent() {
        let (booking, business_id) = setup(CapacityPolicy::multiple(5).unwrap()).await;
        let request = ReservationRequest::new(&business_id, today(), at(11, 0), contact())
            .with_request_id("9b7f1a52-2b7c-4c0e-a1f1-0f2d0c6e4a10");

        let first = booking.reserve(request.clone()).await.unwrap();
        let second = booking.reserve(request).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.id, "9b7f1a52-2b7c-4c0e-a1f1-0f2d0c6e4a10");

        let occupied = booking
            .database()
            .reservations()
            .occupancy(&business_id, today(), at(11, 0))
            .await
            .unwrap();
        assert_eq!(occupied, 1);
    }

    #[tokio::test]
    async fn test_service_duration_is_recorded() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;
        let service = booking
            .database()
            .services()
            .create(&Service {
                id: String::new(),
                business_id: business_id.clone(),
                name: "Colour".to_string(),
                duration_minutes: 90,
                price_cents: 6000,
                available_weekdays: WeekdaySet::all(),
                active_from: None,
                active_until: None,
                is_active: true,
            })
            .await
            .unwrap();

        // 12:00 + 90 min overruns the 13:00 morning close
        let err = booking
            .reserve(ReservationRequest::new(&business_id, today(), at(12, 0), contact()).with_service(&service.id))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::SlotNotOffered { .. }));

        let reservation = booking
            .reserve(ReservationRequest::new(&business_id, today(), at(11, 30), contact()).with_service(&service.id))
            .await
            .unwrap();
        assert_eq!(reservation.duration_minutes, 90);
        assert_eq!(reservation.service_id.as_deref(), Some(service.id.as_str()));
    }

    // -------------------------------------------------------------------------
    // Owner Operations
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cancel_frees_slot() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;
        let reservation = booking
            .reserve(ReservationRequest::new(&business_id, today(), at(17, 0), contact()))
            .await
            .unwrap();

        let cancelled = booking.cancel(&reservation.id).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);

        let slots = booking.get_available_slots(&business_id, today(), None).await.unwrap();
        let slot = slots.iter().find(|s| s.time == at(17, 0)).unwrap();
        assert!(slot.available);
        assert_eq!(slot.occupied, 0);

        booking
            .reserve(ReservationRequest::new(&business_id, today(), at(17, 0), contact()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_confirm_then_cancel() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;
        let reservation = booking
            .reserve(ReservationRequest::new(&business_id, today(), at(18, 0), contact()))
            .await
            .unwrap();

        let confirmed = booking.confirm(&reservation.id).await.unwrap();
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);
        // confirmed still holds the slot
        assert_eq!(
            booking.database().reservations().occupancy(&business_id, today(), at(18, 0)).await.unwrap(),
            1
        );

        booking.cancel(&reservation.id).await.unwrap();
        assert_eq!(booking.cancel(&reservation.id).await.unwrap().status, ReservationStatus::Cancelled);

        let err = booking.confirm(&reservation.id).await.unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidStatusTransition {
                from: ReservationStatus::Cancelled,
                to: ReservationStatus::Confirmed,
                ..
            }
        ));

        let err = booking.confirm("missing").await.unwrap_err();
        assert!(matches!(err, BookingError::ReservationNotFound(_)));
    }

    // -------------------------------------------------------------------------
    // Notifier & Timeout
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_notifier_receives_commit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (booking, business_id) = setup(CapacityPolicy::single()).await;
        let booking = booking.with_notifier(Arc::new(ChannelNotifier(tx)));

        let reservation = booking
            .reserve(ReservationRequest::new(&business_id, today(), at(19, 0), contact()))
            .await
            .unwrap();

        let notice = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notice.reservation_id, reservation.id);
        assert_eq!(notice.business_id, business_id);
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_fail_booking() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;
        let booking = booking.with_notifier(Arc::new(FailingNotifier));

        let result = booking
            .reserve(ReservationRequest::new(&business_id, today(), at(19, 30), contact()))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_timeout_is_indeterminate_then_retry_succeeds() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;
        let booking = booking.with_reserve_timeout(Duration::from_millis(50));
        let request = ReservationRequest::new(&business_id, today(), at(12, 30), contact())
            .with_request_id("1f0e3c2a-7d51-4a0b-9d1e-6c1f4e2b8a77");

        let held = booking
            .locks
            .acquire(SlotKey::new(&business_id, today(), at(12, 30)))
            .await;

        let err = booking.reserve(request.clone()).await.unwrap_err();
        match &err {
            BookingError::Indeterminate { reservation_id } => {
                assert_eq!(reservation_id, "1f0e3c2a-7d51-4a0b-9d1e-6c1f4e2b8a77")
            }
            other => panic!("expected Indeterminate, got {other:?}"),
        }
        assert!(err.is_retryable());

        drop(held);
        let reservation = booking.reserve(request).await.unwrap();
        assert_eq!(reservation.id, "1f0e3c2a-7d51-4a0b-9d1e-6c1f4e2b8a77");
    }

    #[tokio::test]
    async fn test_timeout_finds_row_that_landed() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;
        let id = "3c9d2e71-5a44-4f6b-8e0a-2b7d9c1f6a35";
        booking
            .reserve(ReservationRequest::new(&business_id, today(), at(9, 0), contact()).with_request_id(id))
            .await
            .unwrap();

        let resolved = booking.resolve_timeout(id.to_string()).await.unwrap();
        assert_eq!(resolved.id, id);
        assert_eq!(resolved.time, at(9, 0));
    }

    #[tokio::test]
    async fn test_failed_write_resolved_by_lookup() {
        let (booking, business_id) = setup(CapacityPolicy::single()).await;
        let id = "6e2b8f40-1c7a-4d93-b5e2-0a4f7c3d9b18";
        booking
            .reserve(ReservationRequest::new(&business_id, today(), at(9, 0), contact()).with_request_id(id))
            .await
            .unwrap();

        // Row present: the write went through before the error surfaced.
        let landed = booking
            .resolve_failed_write(id.to_string(), DbError::Internal("disk I/O error".into()))
            .await
            .unwrap();
        assert_eq!(landed.id, id);

        // Row absent: definitely not written, safe to retry.
        let err = booking
            .resolve_failed_write(
                "0d5a7c29-8b1e-4f60-9c3d-e4b2a6f81c07".to_string(),
                DbError::Internal("disk I/O error".into()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::PersistenceUnavailable(_)));
        assert!(err.is_retryable());

        // Lookup itself fails: outcome stays unknown.
        booking.database().close().await;
        let err = booking
            .resolve_failed_write(id.to_string(), DbError::TransactionFailed("commit".into()))
            .await
            .unwrap_err();
        match err {
            BookingError::Indeterminate { reservation_id } => assert_eq!(reservation_id, id),
            other => panic!("expected Indeterminate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_closed_pool_is_retryable_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("closed.db");
        let (booking, business_id) =
            seeded(Database::new(DbConfig::new(path.clone())).await.unwrap(), CapacityPolicy::single()).await;

        booking.database().close().await;
        let err = booking
            .reserve(ReservationRequest::new(&business_id, today(), at(9, 0), contact()))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::PersistenceUnavailable(_)));
        assert!(err.is_retryable());

        let reopened = Database::new(DbConfig::new(path.clone())).await.unwrap();
        let occupied = reopened
            .reservations()
            .occupancy(&business_id, today(), at(9, 0))
            .await
            .unwrap();
        assert_eq!(occupied, 0);
    }

    // -------------------------------------------------------------------------
    // Concurrency
    // -------------------------------------------------------------------------

    async fn race(services: Vec<BookingService>, business_id: &str, attempts: usize) -> (usize, usize) {
        let handles: Vec<_> = (0..attempts)
            .map(|i| {
                let booking = services[i % services.len()].clone();
                let request = ReservationRequest::new(business_id, today(), at(9, 0), contact());
                tokio::spawn(async move { booking.reserve(request).await })
            })
            .collect();

        let mut committed = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => committed += 1,
                Err(BookingError::SlotNoLongerAvailable { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        (committed, rejected)
    }

    async fn file_database(dir: &tempfile::TempDir) -> Database {
        Database::new(DbConfig::new(dir.path().join("race.db")).max_connections(8))
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reserves_never_overfill() {
        let dir = tempfile::tempdir().unwrap();
        let (booking, business_id) = seeded(file_database(&dir).await, CapacityPolicy::multiple(3).unwrap()).await;

        let (committed, rejected) = race(vec![booking.clone()], &business_id, 12).await;
        assert_eq!(committed, 3);
        assert_eq!(rejected, 9);

        let occupied = booking
            .database()
            .reservations()
            .occupancy(&business_id, today(), at(9, 0))
            .await
            .unwrap();
        assert_eq!(occupied, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_database_guard_without_shared_locks() {
        let dir = tempfile::tempdir().unwrap();
        let (first, business_id) = seeded(file_database(&dir).await, CapacityPolicy::single()).await;
        // Separate lock tables: only SQLite serializes these writers.
        let second = BookingService::new(first.database().clone()).with_clock(clock_at(8, 0));
        let third = BookingService::new(first.database().clone()).with_clock(clock_at(8, 0));

        let (committed, rejected) = race(vec![first.clone(), second, third], &business_id, 9).await;
        assert_eq!(committed, 1);
        assert_eq!(rejected, 8);
    }
}
