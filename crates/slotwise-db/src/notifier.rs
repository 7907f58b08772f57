//! # Reservation Notifier
//!
//! Outbound hook fired after a reservation commits (e-mail, push, webhook).
//! Delivery is fire-and-forget: the booking has already succeeded, so a
//! failed notice is logged and never surfaces to the client.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use slotwise_core::{Reservation, ReservationStatus};
use thiserror::Error;
use tracing::info;

/// Payload handed to notifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationNotice {
    pub reservation_id: String,
    pub business_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub service_id: Option<String>,
    pub client_name: String,
    pub status: ReservationStatus,
}

impl From<&Reservation> for ReservationNotice {
    fn from(r: &Reservation) -> Self {
        ReservationNotice {
            reservation_id: r.id.clone(),
            business_id: r.business_id.clone(),
            date: r.date,
            time: r.time,
            service_id: r.service_id.clone(),
            client_name: r.client_name.clone(),
            status: r.status,
        }
    }
}

/// Notification failures. Logged, never returned to booking callers.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Receives committed reservations.
#[async_trait]
pub trait ReservationNotifier: Send + Sync + std::fmt::Debug {
    async fn notify(&self, notice: &ReservationNotice) -> Result<(), NotifyError>;
}

/// Discards every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl ReservationNotifier for NoopNotifier {
    async fn notify(&self, _notice: &ReservationNotice) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Writes each notice as JSON to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl ReservationNotifier for LoggingNotifier {
    async fn notify(&self, notice: &ReservationNotice) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(notice)?;
        info!(
            reservation_id = %notice.reservation_id,
            business_id = %notice.business_id,
            %payload,
            "Reservation created"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice() -> ReservationNotice {
        ReservationNotice {
            reservation_id: "r-1".to_string(),
            business_id: "b-1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            service_id: None,
            client_name: "Ana".to_string(),
            status: ReservationStatus::Pending,
        }
    }

    #[test]
    fn test_notice_payload_shape() {
        let json = serde_json::to_value(notice()).unwrap();
        assert_eq!(json["reservation_id"], "r-1");
        assert_eq!(json["date"], "2026-10-19");
        assert_eq!(json["time"], "09:30:00");
        assert_eq!(json["status"], "pending");
    }

    #[tokio::test]
    async fn test_builtin_notifiers_succeed() {
        assert!(NoopNotifier.notify(&notice()).await.is_ok());
        assert!(LoggingNotifier.notify(&notice()).await.is_ok());
    }
}
