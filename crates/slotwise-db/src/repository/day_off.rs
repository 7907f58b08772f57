//! # Day-Off Repository
//!
//! The exception calendar: one row per closed date.
//!
//! ## Ranges Are Derived
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_range(Aug 1 .. Aug 4, "Holidays")                                 │
//! │       │                                                                 │
//! │       ▼  expand_range + INSERT .. ON CONFLICT DO NOTHING               │
//! │  days_off: Aug 1, Aug 2, Aug 3, Aug 4      (existing dates skipped)    │
//! │       │                                                                 │
//! │       ▼  ranges() = group_ranges(list())                               │
//! │  [Aug 1 .. Aug 4 "Holidays"]                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use slotwise_core::calendar::{expand_range, group_ranges};
use slotwise_core::validation::validate_notes;
use slotwise_core::{DayOff, DayOffRange, ExceptionCalendar};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const SELECT_DAY_OFF: &str = "SELECT id, business_id, date, reason FROM days_off";

/// Repository for days off.
#[derive(Debug, Clone)]
pub struct DayOffRepository {
    pool: SqlitePool,
}

impl DayOffRepository {
    /// Creates a new DayOffRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DayOffRepository { pool }
    }

    /// Marks a single date closed.
    ///
    /// ## Returns
    /// * `Ok(DayOff)` - The stored row
    /// * `Err(DbError::UniqueViolation)` - The date is already a day off
    pub async fn add(&self, business_id: &str, date: NaiveDate, reason: Option<&str>) -> DbResult<DayOff> {
        let reason = normalize_reason(reason)?;
        let day_off = DayOff {
            id: Uuid::new_v4().to_string(),
            business_id: business_id.to_string(),
            date,
            reason,
        };

        debug!(business_id = %business_id, %date, "Adding day off");

        sqlx::query(
            r#"
            INSERT INTO days_off (id, business_id, date, reason, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&day_off.id)
        .bind(&day_off.business_id)
        .bind(day_off.date)
        .bind(&day_off.reason)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("day off", date.to_string()),
            other => other,
        })?;

        Ok(day_off)
    }

    /// Closes every date in `[start, end]`, skipping dates already closed.
    ///
    /// ## Returns
    /// Number of dates newly inserted. Zero when the whole range was
    /// already closed.
    pub async fn add_range(
        &self,
        business_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        reason: Option<&str>,
    ) -> DbResult<u64> {
        let dates = expand_range(start, end)?;
        let reason = normalize_reason(reason)?;
        let now = Utc::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let mut inserted = 0;
        for date in &dates {
            let result = sqlx::query(
                r#"
                INSERT INTO days_off (id, business_id, date, reason, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (business_id, date) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(business_id)
            .bind(*date)
            .bind(&reason)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            business_id = %business_id,
            %start,
            %end,
            requested = dates.len(),
            inserted,
            "Day-off range added"
        );
        Ok(inserted)
    }

    /// All days off, oldest first.
    pub async fn list(&self, business_id: &str) -> DbResult<Vec<DayOff>> {
        let rows = sqlx::query_as::<_, DayOff>(&format!(
            "{SELECT_DAY_OFF} WHERE business_id = ?1 ORDER BY date"
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Days off within `[from, to]`.
    pub async fn list_between(&self, business_id: &str, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<DayOff>> {
        let rows = sqlx::query_as::<_, DayOff>(&format!(
            "{SELECT_DAY_OFF} WHERE business_id = ?1 AND date BETWEEN ?2 AND ?3 ORDER BY date"
        ))
        .bind(business_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Contiguous same-reason runs, for display.
    pub async fn ranges(&self, business_id: &str) -> DbResult<Vec<DayOffRange>> {
        let rows = self.list(business_id).await?;
        Ok(group_ranges(&rows))
    }

    /// The full exception calendar of a business.
    pub async fn calendar(&self, business_id: &str) -> DbResult<ExceptionCalendar> {
        let rows = self.list(business_id).await?;
        Ok(ExceptionCalendar::from_days_off(&rows))
    }

    /// The exception calendar restricted to `[from, to]`.
    pub async fn calendar_between(
        &self,
        business_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<ExceptionCalendar> {
        let rows = self.list_between(business_id, from, to).await?;
        Ok(ExceptionCalendar::from_days_off(&rows))
    }

    /// Reopens one date by day-off id.
    pub async fn delete(&self, business_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM days_off WHERE business_id = ?1 AND id = ?2")
            .bind(business_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DayOff", id));
        }

        debug!(business_id = %business_id, id = %id, "Day off deleted");
        Ok(())
    }

    /// Reopens every date sharing a reason (`None` matches rows without one).
    ///
    /// ## Returns
    /// Number of dates reopened.
    pub async fn delete_by_reason(&self, business_id: &str, reason: Option<&str>) -> DbResult<u64> {
        let reason = normalize_reason(reason)?;
        let result = sqlx::query("DELETE FROM days_off WHERE business_id = ?1 AND reason IS ?2")
            .bind(business_id)
            .bind(&reason)
            .execute(&self.pool)
            .await?;

        info!(
            business_id = %business_id,
            reason = reason.as_deref().unwrap_or("-"),
            deleted = result.rows_affected(),
            "Day-off group deleted"
        );
        Ok(result.rows_affected())
    }

    /// Reopens every date in `[start, end]`.
    pub async fn delete_range(&self, business_id: &str, start: NaiveDate, end: NaiveDate) -> DbResult<u64> {
        expand_range(start, end)?;
        let result = sqlx::query("DELETE FROM days_off WHERE business_id = ?1 AND date BETWEEN ?2 AND ?3")
            .bind(business_id)
            .bind(start)
            .bind(end)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Blank reasons are stored as NULL.
fn normalize_reason(reason: Option<&str>) -> DbResult<Option<String>> {
    match reason.map(str::trim) {
        Some(r) if !r.is_empty() => {
            validate_notes(r)?;
            Ok(Some(r.to_string()))
        }
        _ => Ok(None),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
