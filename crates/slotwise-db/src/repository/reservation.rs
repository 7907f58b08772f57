//! # Reservation Repository
//!
//! The capacity ledger: every question about how full a slot is gets
//! answered here, and the only write that can consume capacity lives here.
//!
//! ## Conditional Insert
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSERT INTO reservations (...)                                         │
//! │  SELECT ?1, ?2, ...                                                     │
//! │  WHERE (SELECT COUNT(*) FROM reservations                               │
//! │         WHERE business_id = ? AND date = ? AND time = ?                 │
//! │           AND status IN ('pending', 'confirmed')) < ?max               │
//! │                                                                         │
//! │  One statement = one implicit write transaction. SQLite takes the      │
//! │  write lock before evaluating the count, so two writers can never      │
//! │  both see "room for one more".                                         │
//! │                                                                         │
//! │  rows_affected = 1  → committed                                        │
//! │  rows_affected = 0  → slot full, nothing written                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use slotwise_core::{Reservation, ReservationStatus};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

const SELECT_RESERVATION: &str = r#"
    SELECT id, business_id, date, time, duration_minutes, service_id, status,
           client_name, client_email, client_phone, notes,
           created_at, updated_at
    FROM reservations
"#;

/// Repository for reservations and slot occupancy.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    /// Creates a new ReservationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    /// Number of pending or confirmed reservations holding a slot.
    pub async fn occupancy(&self, business_id: &str, date: NaiveDate, time: NaiveTime) -> DbResult<u32> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM reservations
            WHERE business_id = ?1 AND date = ?2 AND time = ?3
              AND status IN ('pending', 'confirmed')
            "#,
        )
        .bind(business_id)
        .bind(date)
        .bind(time)
        .fetch_one(&self.pool)
        .await?;

        Ok(clamp_count(count))
    }

    /// Occupancy of every slot start on a date, in one query.
    ///
    /// Times without reservations are absent from the map.
    pub async fn occupancy_by_time(&self, business_id: &str, date: NaiveDate) -> DbResult<HashMap<NaiveTime, u32>> {
        let rows: Vec<(NaiveTime, i64)> = sqlx::query_as(
            r#"
            SELECT time, COUNT(*) FROM reservations
            WHERE business_id = ?1 AND date = ?2
              AND status IN ('pending', 'confirmed')
            GROUP BY time
            "#,
        )
        .bind(business_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(time, count)| (time, clamp_count(count)))
            .collect())
    }

    /// All reservations on a date, any status, by start time.
    pub async fn list_for_date(&self, business_id: &str, date: NaiveDate) -> DbResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(&format!(
            "{SELECT_RESERVATION} WHERE business_id = ?1 AND date = ?2 ORDER BY time, created_at"
        ))
        .bind(business_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Gets a reservation by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, Reservation>(&format!("{SELECT_RESERVATION} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    /// Inserts `reservation` only if its slot holds fewer than `max_per_slot`
    /// active reservations.
    ///
    /// ## Returns
    /// * `Ok(true)` - Row written and committed
    /// * `Ok(false)` - Slot full; nothing written
    /// * `Err(DbError::UniqueViolation)` - The id already exists
    pub async fn insert_if_capacity(&self, reservation: &Reservation, max_per_slot: u32) -> DbResult<bool> {
        debug!(
            id = %reservation.id,
            business_id = %reservation.business_id,
            date = %reservation.date,
            time = %reservation.time,
            max_per_slot,
            "Conditional reservation insert"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO reservations (
                id, business_id, date, time, duration_minutes, service_id, status,
                client_name, client_email, client_phone, notes,
                created_at, updated_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13
            WHERE (
                SELECT COUNT(*) FROM reservations
                WHERE business_id = ?2 AND date = ?3 AND time = ?4
                  AND status IN ('pending', 'confirmed')
            ) < ?14
            "#,
        )
        .bind(&reservation.id)
        .bind(&reservation.business_id)
        .bind(reservation.date)
        .bind(reservation.time)
        .bind(reservation.duration_minutes)
        .bind(&reservation.service_id)
        .bind(reservation.status)
        .bind(&reservation.client_name)
        .bind(&reservation.client_email)
        .bind(&reservation.client_phone)
        .bind(&reservation.notes)
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .bind(max_per_slot)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("reservation id", &reservation.id),
            other => other,
        })?;

        Ok(result.rows_affected() == 1)
    }

    /// Moves a reservation from `from` to `to`, only if it is still in `from`.
    ///
    /// ## Returns
    /// * `Ok(true)` - Status changed
    /// * `Ok(false)` - The row was changed by someone else first
    pub async fn update_status(
        &self,
        id: &str,
        from: ReservationStatus,
        to: ReservationStatus,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, %from, %to, "Updating reservation status");

        let result = sqlx::query(
            "UPDATE reservations SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn clamp_count(count: i64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use slotwise_core::CapacityPolicy;
    use uuid::Uuid;

    async fn setup() -> (ReservationRepository, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let business = db
            .businesses()
            .create("Studio", CapacityPolicy::multiple(2).unwrap(), 0)
            .await
            .unwrap();
        (db.reservations(), business.id)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn reservation(business_id: &str, time: NaiveTime) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: Uuid::new_v4().to_string(),
            business_id: business_id.to_string(),
            date: date(),
            time,
            duration_minutes: 30,
            service_id: None,
            status: ReservationStatus::Pending,
            client_name: "Ana".to_string(),
            client_email: Some("ana@example.com".to_string()),
            client_phone: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_conditional_insert_respects_max() {
        let (repo, business_id) = setup().await;

        assert!(repo.insert_if_capacity(&reservation(&business_id, at(9, 0)), 2).await.unwrap());
        assert!(repo.insert_if_capacity(&reservation(&business_id, at(9, 0)), 2).await.unwrap());
        assert!(!repo.insert_if_capacity(&reservation(&business_id, at(9, 0)), 2).await.unwrap());

        assert_eq!(repo.occupancy(&business_id, date(), at(9, 0)).await.unwrap(), 2);
        assert_eq!(repo.list_for_date(&business_id, date()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_unique_violation() {
        let (repo, business_id) = setup().await;
        let r = reservation(&business_id, at(9, 0));
        assert!(repo.insert_if_capacity(&r, 2).await.unwrap());

        let err = repo.insert_if_capacity(&r, 2).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_rows_free_capacity() {
        let (repo, business_id) = setup().await;
        let first = reservation(&business_id, at(10, 0));
        repo.insert_if_capacity(&first, 1).await.unwrap();
        assert!(!repo.insert_if_capacity(&reservation(&business_id, at(10, 0)), 1).await.unwrap());

        let changed = repo
            .update_status(&first.id, ReservationStatus::Pending, ReservationStatus::Cancelled, Utc::now())
            .await
            .unwrap();
        assert!(changed);
        assert_eq!(repo.occupancy(&business_id, date(), at(10, 0)).await.unwrap(), 0);
        assert!(repo.insert_if_capacity(&reservation(&business_id, at(10, 0)), 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_status_update_is_noop() {
        let (repo, business_id) = setup().await;
        let r = reservation(&business_id, at(11, 0));
        repo.insert_if_capacity(&r, 1).await.unwrap();

        let changed = repo
            .update_status(&r.id, ReservationStatus::Confirmed, ReservationStatus::Cancelled, Utc::now())
            .await
            .unwrap();
        assert!(!changed);

        let stored = repo.get_by_id(&r.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn test_occupancy_by_time() {
        let (repo, business_id) = setup().await;
        repo.insert_if_capacity(&reservation(&business_id, at(9, 0)), 2).await.unwrap();
        repo.insert_if_capacity(&reservation(&business_id, at(9, 0)), 2).await.unwrap();
        repo.insert_if_capacity(&reservation(&business_id, at(9, 30)), 2).await.unwrap();

        let map = repo.occupancy_by_time(&business_id, date()).await.unwrap();
        assert_eq!(map.get(&at(9, 0)), Some(&2));
        assert_eq!(map.get(&at(9, 30)), Some(&1));
        assert_eq!(map.get(&at(10, 0)), None);
    }
}
