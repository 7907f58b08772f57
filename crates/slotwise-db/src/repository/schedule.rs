//! # Schedule Repository
//!
//! Weekly working hours, one row per (business, weekday).
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  day_schedules                                                          │
//! │                                                                         │
//! │  weekday │ enabled │ continuous │ start..end │ morning │ afternoon     │
//! │  ────────┼─────────┼────────────┼────────────┼─────────┼───────────    │
//! │     0    │    1    │     0      │    NULL    │ 09-13   │ 16-20         │
//! │     1    │    1    │     1      │   10-18    │  NULL   │  NULL         │
//! │     6    │    0    │     1      │    NULL    │  NULL   │  NULL         │
//! │                                                                         │
//! │  Saving replaces all seven rows in one transaction, so readers never   │
//! │  observe a half-written week.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveTime, Weekday};
use slotwise_core::schedule::weekday_index;
use slotwise_core::{DaySchedule, TimeWindow, WeeklySchedule, WorkingHours};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

/// Flat row shape of `day_schedules`.
#[derive(Debug, Clone, sqlx::FromRow)]
struct DayScheduleRow {
    weekday: u8,
    enabled: bool,
    is_continuous: bool,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    morning_start: Option<NaiveTime>,
    morning_end: Option<NaiveTime>,
    afternoon_start: Option<NaiveTime>,
    afternoon_end: Option<NaiveTime>,
    slot_duration_minutes: u32,
}

impl DayScheduleRow {
    fn from_domain(day: &DaySchedule) -> Self {
        let mut row = DayScheduleRow {
            weekday: day.weekday,
            enabled: day.enabled,
            is_continuous: day.hours.is_continuous(),
            start_time: None,
            end_time: None,
            morning_start: None,
            morning_end: None,
            afternoon_start: None,
            afternoon_end: None,
            slot_duration_minutes: day.slot_duration_minutes,
        };
        match day.hours {
            WorkingHours::Continuous { window } => {
                row.start_time = Some(window.start);
                row.end_time = Some(window.end);
            }
            WorkingHours::Split { morning, afternoon } => {
                row.morning_start = Some(morning.start);
                row.morning_end = Some(morning.end);
                row.afternoon_start = Some(afternoon.start);
                row.afternoon_end = Some(afternoon.end);
            }
        }
        row
    }

    fn into_domain(self) -> DaySchedule {
        // Missing bounds read as an empty window, which generates nothing.
        let window = |start: Option<NaiveTime>, end: Option<NaiveTime>| {
            TimeWindow::new(
                start.unwrap_or(NaiveTime::MIN),
                end.unwrap_or(NaiveTime::MIN),
            )
        };
        let hours = if self.is_continuous {
            WorkingHours::Continuous {
                window: window(self.start_time, self.end_time),
            }
        } else {
            WorkingHours::Split {
                morning: window(self.morning_start, self.morning_end),
                afternoon: window(self.afternoon_start, self.afternoon_end),
            }
        };
        DaySchedule {
            weekday: self.weekday,
            enabled: self.enabled,
            hours,
            slot_duration_minutes: self.slot_duration_minutes,
        }
    }
}

const SELECT_DAY: &str = r#"
    SELECT weekday, enabled, is_continuous,
           start_time, end_time,
           morning_start, morning_end, afternoon_start, afternoon_end,
           slot_duration_minutes
    FROM day_schedules
"#;

const UPSERT_DAY: &str = r#"
    INSERT INTO day_schedules (
        business_id, weekday, enabled, is_continuous,
        start_time, end_time,
        morning_start, morning_end, afternoon_start, afternoon_end,
        slot_duration_minutes
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
    ON CONFLICT (business_id, weekday) DO UPDATE SET
        enabled = excluded.enabled,
        is_continuous = excluded.is_continuous,
        start_time = excluded.start_time,
        end_time = excluded.end_time,
        morning_start = excluded.morning_start,
        morning_end = excluded.morning_end,
        afternoon_start = excluded.afternoon_start,
        afternoon_end = excluded.afternoon_end,
        slot_duration_minutes = excluded.slot_duration_minutes
"#;

/// Repository for weekly schedules.
#[derive(Debug, Clone)]
pub struct ScheduleRepository {
    pool: SqlitePool,
}

impl ScheduleRepository {
    /// Creates a new ScheduleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ScheduleRepository { pool }
    }

    /// Validates and stores a full week.
    ///
    /// ## Returns
    /// * `Ok(WeeklySchedule)` - All seven rows written
    /// * `Err(DbError::Core)` - A day failed validation, or a weekday is
    ///   missing or repeated; nothing was written
    pub async fn save_week(&self, business_id: &str, days: Vec<DaySchedule>) -> DbResult<WeeklySchedule> {
        let week = WeeklySchedule::from_days(days)?;

        debug!(business_id = %business_id, "Saving weekly schedule");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query("DELETE FROM day_schedules WHERE business_id = ?1")
            .bind(business_id)
            .execute(&mut *tx)
            .await?;

        for day in week.days() {
            let row = DayScheduleRow::from_domain(day);
            bind_row(sqlx::query(UPSERT_DAY), business_id, &row)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            business_id = %business_id,
            open_days = week.days().iter().filter(|d| d.enabled).count(),
            "Weekly schedule saved"
        );
        Ok(week)
    }

    /// Validates and stores a single day, leaving the rest of the week as is.
    pub async fn save_day(&self, business_id: &str, day: DaySchedule) -> DbResult<()> {
        day.validate()?;

        debug!(business_id = %business_id, weekday = day.weekday, "Saving day schedule");

        let row = DayScheduleRow::from_domain(&day);
        bind_row(sqlx::query(UPSERT_DAY), business_id, &row)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Loads the week; weekdays without a row are closed.
    pub async fn get_week(&self, business_id: &str) -> DbResult<WeeklySchedule> {
        let rows = sqlx::query_as::<_, DayScheduleRow>(&format!(
            "{SELECT_DAY} WHERE business_id = ?1 ORDER BY weekday"
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(WeeklySchedule::from_partial(
            rows.into_iter().map(DayScheduleRow::into_domain).collect(),
        ))
    }

    /// Loads one weekday; closed when the row is missing.
    pub async fn get_day(&self, business_id: &str, weekday: Weekday) -> DbResult<DaySchedule> {
        let index = weekday_index(weekday);
        let row = sqlx::query_as::<_, DayScheduleRow>(&format!(
            "{SELECT_DAY} WHERE business_id = ?1 AND weekday = ?2"
        ))
        .bind(business_id)
        .bind(index)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .map(DayScheduleRow::into_domain)
            .unwrap_or_else(|| DaySchedule::closed(index)))
    }
}

fn bind_row<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    business_id: &'q str,
    row: &DayScheduleRow,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(business_id)
        .bind(row.weekday)
        .bind(row.enabled)
        .bind(row.is_continuous)
        .bind(row.start_time)
        .bind(row.end_time)
        .bind(row.morning_start)
        .bind(row.morning_end)
        .bind(row.afternoon_start)
        .bind(row.afternoon_end)
        .bind(row.slot_duration_minutes)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use slotwise_core::{CapacityPolicy, ConfigurationError, CoreError};

    async fn setup() -> (ScheduleRepository, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let business = db
            .businesses()
            .create("Studio", CapacityPolicy::single(), 0)
            .await
            .unwrap();
        (db.schedules(), business.id)
    }

    fn hm(start: (u32, u32), end: (u32, u32)) -> TimeWindow {
        TimeWindow::from_hm(start, end).unwrap()
    }

    fn split_week() -> Vec<DaySchedule> {
        (0..7u8)
            .map(|w| match w {
                0..=4 => DaySchedule::split(w, hm((9, 0), (13, 0)), hm((16, 0), (20, 0)), 30),
                5 => DaySchedule::continuous(w, hm((10, 0), (14, 0)), 60),
                _ => DaySchedule::closed(w),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_save_and_load_week() {
        let (repo, business_id) = setup().await;
        let saved = repo.save_week(&business_id, split_week()).await.unwrap();
        let loaded = repo.get_week(&business_id).await.unwrap();
        assert_eq!(saved, loaded);

        let saturday = repo.get_day(&business_id, Weekday::Sat).await.unwrap();
        assert!(saturday.hours.is_continuous());
        assert_eq!(saturday.slot_duration_minutes, 60);
    }

    #[tokio::test]
    async fn test_unsaved_week_is_closed() {
        let (repo, business_id) = setup().await;
        let week = repo.get_week(&business_id).await.unwrap();
        assert!(week.days().iter().all(|d| !d.enabled));

        let monday = repo.get_day(&business_id, Weekday::Mon).await.unwrap();
        assert_eq!(monday, DaySchedule::closed(0));
    }

    #[tokio::test]
    async fn test_invalid_week_writes_nothing() {
        let (repo, business_id) = setup().await;
        repo.save_week(&business_id, split_week()).await.unwrap();

        let mut bad = split_week();
        bad[2] = DaySchedule::continuous(2, hm((18, 0), (9, 0)), 30);
        let err = repo.save_week(&business_id, bad).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Configuration(ConfigurationError::InvertedWindow { weekday: 2, .. }))
        ));

        let wednesday = repo.get_day(&business_id, Weekday::Wed).await.unwrap();
        assert!(!wednesday.hours.is_continuous());
    }

    #[tokio::test]
    async fn test_missing_day_rejected() {
        let (repo, business_id) = setup().await;
        let mut days = split_week();
        days.pop();
        let err = repo.save_week(&business_id, days).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Configuration(ConfigurationError::MissingDay(6)))
        ));
    }

    #[tokio::test]
    async fn test_save_day_upserts() {
        let (repo, business_id) = setup().await;
        repo.save_week(&business_id, split_week()).await.unwrap();

        repo.save_day(&business_id, DaySchedule::continuous(6, hm((11, 0), (15, 0)), 15))
            .await
            .unwrap();

        let sunday = repo.get_day(&business_id, Weekday::Sun).await.unwrap();
        assert!(sunday.enabled);
        assert_eq!(sunday.slot_duration_minutes, 15);
        let friday = repo.get_day(&business_id, Weekday::Fri).await.unwrap();
        assert!(!friday.hours.is_continuous());
    }

    #[tokio::test]
    async fn test_zero_duration_rejected() {
        let (repo, business_id) = setup().await;
        let err = repo
            .save_day(&business_id, DaySchedule::continuous(1, hm((9, 0), (17, 0)), 0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Configuration(ConfigurationError::ZeroSlotDuration { weekday: 1 }))
        ));
    }
}
