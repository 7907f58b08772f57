//! # Business Repository
//!
//! Businesses own everything else: schedules, days off, services and
//! reservations all cascade from a business row.

use chrono::Utc;
use slotwise_core::validation::{validate_business_name, validate_utc_offset_minutes};
use slotwise_core::{Business, CapacityPolicy};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const SELECT_BUSINESS: &str = r#"
    SELECT id, name, allow_multiple, max_per_slot, utc_offset_minutes,
           created_at, updated_at
    FROM businesses
"#;

/// Repository for business database operations.
#[derive(Debug, Clone)]
pub struct BusinessRepository {
    pool: SqlitePool,
}

impl BusinessRepository {
    /// Creates a new BusinessRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BusinessRepository { pool }
    }

    /// Creates a business with the given capacity policy.
    ///
    /// ## Returns
    /// * `Ok(Business)` - The stored business with its generated id
    /// * `Err(DbError::Core)` - Name, offset or policy rejected
    pub async fn create(
        &self,
        name: &str,
        policy: CapacityPolicy,
        utc_offset_minutes: i32,
    ) -> DbResult<Business> {
        validate_business_name(name)?;
        validate_utc_offset_minutes(utc_offset_minutes)?;
        let policy = normalize_policy(policy)?;

        let now = Utc::now();
        let business = Business {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            allow_multiple: policy.allow_multiple,
            max_per_slot: policy.max_per_slot,
            utc_offset_minutes,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %business.id, name = %business.name, "Inserting business");

        sqlx::query(
            r#"
            INSERT INTO businesses (
                id, name, allow_multiple, max_per_slot, utc_offset_minutes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&business.id)
        .bind(&business.name)
        .bind(business.allow_multiple)
        .bind(business.max_per_slot)
        .bind(business.utc_offset_minutes)
        .bind(business.created_at)
        .bind(business.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(business)
    }

    /// Gets a business by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Business>> {
        let business = sqlx::query_as::<_, Business>(&format!("{SELECT_BUSINESS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(business)
    }

    /// Lists all businesses by name.
    pub async fn list(&self) -> DbResult<Vec<Business>> {
        let businesses = sqlx::query_as::<_, Business>(&format!("{SELECT_BUSINESS} ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;

        Ok(businesses)
    }

    /// Changes how many reservations a slot accepts.
    ///
    /// ## Lowering Below Current Occupancy
    /// Existing reservations are kept. A slot already holding more than the
    /// new maximum simply reports unavailable until cancellations bring it
    /// back under. The number of such slots is logged.
    pub async fn update_capacity_policy(&self, id: &str, policy: CapacityPolicy) -> DbResult<()> {
        let policy = normalize_policy(policy)?;
        let now = Utc::now();

        debug!(
            id = %id,
            allow_multiple = policy.allow_multiple,
            max_per_slot = policy.max_per_slot,
            "Updating capacity policy"
        );

        let result = sqlx::query(
            r#"
            UPDATE businesses
            SET allow_multiple = ?2, max_per_slot = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(policy.allow_multiple)
        .bind(policy.max_per_slot)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Business", id));
        }

        let overbooked: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM (
                SELECT date, time
                FROM reservations
                WHERE business_id = ?1 AND status IN ('pending', 'confirmed')
                GROUP BY date, time
                HAVING COUNT(*) > ?2
            )
            "#,
        )
        .bind(id)
        .bind(policy.effective_max())
        .fetch_one(&self.pool)
        .await?;

        if overbooked > 0 {
            warn!(
                business_id = %id,
                slots = overbooked,
                max_per_slot = policy.effective_max(),
                "Capacity lowered below existing occupancy; reservations kept"
            );
        } else {
            info!(business_id = %id, "Capacity policy updated");
        }

        Ok(())
    }

    /// Moves the business to another UTC offset.
    pub async fn update_utc_offset(&self, id: &str, utc_offset_minutes: i32) -> DbResult<()> {
        validate_utc_offset_minutes(utc_offset_minutes)?;

        let result = sqlx::query(
            "UPDATE businesses SET utc_offset_minutes = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(utc_offset_minutes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Business", id));
        }

        Ok(())
    }
}

/// Single-booking businesses always store `max_per_slot = 1`.
fn normalize_policy(policy: CapacityPolicy) -> DbResult<CapacityPolicy> {
    if policy.allow_multiple {
        Ok(CapacityPolicy::multiple(policy.max_per_slot)?)
    } else {
        Ok(CapacityPolicy::single())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use slotwise_core::{CoreError, ValidationError};

    async fn repo() -> BusinessRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().businesses()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = repo().await;
        let created = repo
            .create("  Studio Nine ", CapacityPolicy::multiple(3).unwrap(), 120)
            .await
            .unwrap();

        let loaded = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Studio Nine");
        assert_eq!(loaded.capacity_policy().effective_max(), 3);
        assert_eq!(loaded.utc_offset_minutes, 120);
    }

    #[tokio::test]
    async fn test_single_policy_stores_one() {
        let repo = repo().await;
        let policy = CapacityPolicy {
            allow_multiple: false,
            max_per_slot: 9,
        };
        let created = repo.create("Barber", policy, 0).await.unwrap();
        assert_eq!(created.max_per_slot, 1);
    }

    #[tokio::test]
    async fn test_rejects_zero_capacity() {
        let repo = repo().await;
        let policy = CapacityPolicy {
            allow_multiple: true,
            max_per_slot: 0,
        };
        let err = repo.create("Gym", policy, 0).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_business() {
        let repo = repo().await;
        let err = repo
            .update_capacity_policy("nope", CapacityPolicy::single())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_capacity_policy() {
        let repo = repo().await;
        let created = repo.create("Clinic", CapacityPolicy::single(), 0).await.unwrap();

        repo.update_capacity_policy(&created.id, CapacityPolicy::multiple(4).unwrap())
            .await
            .unwrap();

        let loaded = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert!(loaded.allow_multiple);
        assert_eq!(loaded.max_per_slot, 4);
    }
}
