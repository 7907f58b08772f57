//! # Service Repository
//!
//! Database operations for the service catalog.
//!
//! ## Catalog Rules
//! - Only active services are offered to clients
//! - A business with no active services books the implicit general offering
//! - Services are soft-deleted (`is_active = 0`) so past reservations keep
//!   a valid `service_id`

use chrono::{NaiveDate, Utc};
use slotwise_core::{Service, ServiceCatalog, WeekdaySet};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Row shape of `services`; the weekday set is stored as a bitmask.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ServiceRow {
    id: String,
    business_id: String,
    name: String,
    duration_minutes: u32,
    price_cents: i64,
    available_weekdays: u8,
    active_from: Option<NaiveDate>,
    active_until: Option<NaiveDate>,
    is_active: bool,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Service {
            id: row.id,
            business_id: row.business_id,
            name: row.name,
            duration_minutes: row.duration_minutes,
            price_cents: row.price_cents,
            available_weekdays: WeekdaySet::from_bits(row.available_weekdays),
            active_from: row.active_from,
            active_until: row.active_until,
            is_active: row.is_active,
        }
    }
}

const SELECT_SERVICE: &str = r#"
    SELECT id, business_id, name, duration_minutes, price_cents,
           available_weekdays, active_from, active_until, is_active
    FROM services
"#;

/// Repository for service database operations.
#[derive(Debug, Clone)]
pub struct ServiceRepository {
    pool: SqlitePool,
}

impl ServiceRepository {
    /// Creates a new ServiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ServiceRepository { pool }
    }

    /// Validates and inserts a service.
    ///
    /// An empty `id` is replaced with a fresh UUID.
    ///
    /// ## Returns
    /// * `Ok(Service)` - The stored service
    /// * `Err(DbError::Core)` - The service failed validation
    pub async fn create(&self, service: &Service) -> DbResult<Service> {
        service.validate()?;

        let mut service = service.clone();
        if service.id.is_empty() {
            service.id = generate_service_id();
        }
        service.name = service.name.trim().to_string();
        let now = Utc::now();

        debug!(id = %service.id, name = %service.name, "Inserting service");

        sqlx::query(
            r#"
            INSERT INTO services (
                id, business_id, name, duration_minutes, price_cents,
                available_weekdays, active_from, active_until, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&service.id)
        .bind(&service.business_id)
        .bind(&service.name)
        .bind(service.duration_minutes)
        .bind(service.price_cents)
        .bind(service.available_weekdays.bits())
        .bind(service.active_from)
        .bind(service.active_until)
        .bind(service.is_active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(service)
    }

    /// Validates and updates an existing service.
    pub async fn update(&self, service: &Service) -> DbResult<()> {
        service.validate()?;

        debug!(id = %service.id, "Updating service");

        let result = sqlx::query(
            r#"
            UPDATE services SET
                name = ?2,
                duration_minutes = ?3,
                price_cents = ?4,
                available_weekdays = ?5,
                active_from = ?6,
                active_until = ?7,
                is_active = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&service.id)
        .bind(service.name.trim())
        .bind(service.duration_minutes)
        .bind(service.price_cents)
        .bind(service.available_weekdays.bits())
        .bind(service.active_from)
        .bind(service.active_until)
        .bind(service.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service", &service.id));
        }

        Ok(())
    }

    /// Gets a service by its ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Service>> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!("{SELECT_SERVICE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Service::from))
    }

    /// Active services of a business, by name.
    pub async fn list_active(&self, business_id: &str) -> DbResult<Vec<Service>> {
        let rows = sqlx::query_as::<_, ServiceRow>(&format!(
            "{SELECT_SERVICE} WHERE business_id = ?1 AND is_active = 1 ORDER BY name"
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Service::from).collect())
    }

    /// Soft-deletes a service.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE services SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service", id));
        }

        info!(id = %id, "Service deactivated");
        Ok(())
    }

    /// The active catalog a booking resolves against.
    pub async fn catalog(&self, business_id: &str) -> DbResult<ServiceCatalog> {
        Ok(ServiceCatalog::new(self.list_active(business_id).await?))
    }
}

/// Generates a new service ID.
pub fn generate_service_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use slotwise_core::{CapacityPolicy, CoreError, Offering};

    async fn setup() -> (ServiceRepository, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let business = db
            .businesses()
            .create("Studio", CapacityPolicy::single(), 0)
            .await
            .unwrap();
        (db.services(), business.id)
    }

    fn draft(business_id: &str, name: &str) -> Service {
        Service {
            id: String::new(),
            business_id: business_id.to_string(),
            name: name.to_string(),
            duration_minutes: 45,
            price_cents: 3000,
            available_weekdays: WeekdaySet::from_indices(&[5, 6]).unwrap(),
            active_from: NaiveDate::from_ymd_opt(2026, 1, 1),
            active_until: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (repo, business_id) = setup().await;
        let created = repo.create(&draft(&business_id, "Massage")).await.unwrap();
        assert!(!created.id.is_empty());

        let loaded = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.available_weekdays.indices(), vec![5, 6]);
    }

    #[tokio::test]
    async fn test_update() {
        let (repo, business_id) = setup().await;
        let mut service = repo.create(&draft(&business_id, "Massage")).await.unwrap();

        service.duration_minutes = 60;
        service.available_weekdays = WeekdaySet::all();
        repo.update(&service).await.unwrap();

        let loaded = repo.get_by_id(&service.id).await.unwrap().unwrap();
        assert_eq!(loaded.duration_minutes, 60);
        assert_eq!(loaded.available_weekdays, WeekdaySet::all());
    }

    #[tokio::test]
    async fn test_invalid_service_rejected() {
        let (repo, business_id) = setup().await;
        let mut bad = draft(&business_id, "Massage");
        bad.duration_minutes = 0;
        let err = repo.create(&bad).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_catalog_resolution() {
        let (repo, business_id) = setup().await;

        let empty = repo.catalog(&business_id).await.unwrap();
        assert_eq!(empty.resolve(None).unwrap(), Offering::General);

        let service = repo.create(&draft(&business_id, "Massage")).await.unwrap();
        let catalog = repo.catalog(&business_id).await.unwrap();
        assert!(matches!(catalog.resolve(None), Err(CoreError::ServiceRequired)));
        assert_eq!(catalog.resolve(Some(&service.id)).unwrap().service_id(), Some(service.id.as_str()));

        repo.deactivate(&service.id).await.unwrap();
        assert!(repo.list_active(&business_id).await.unwrap().is_empty());
        assert!(repo.get_by_id(&service.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_deactivate_missing() {
        let (repo, _) = setup().await;
        let err = repo.deactivate("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
