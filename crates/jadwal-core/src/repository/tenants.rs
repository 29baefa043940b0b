use crate::error::CoreError;
use crate::models::Tenant;
use crate::repository::{SqliteRepository, TenantRepository};
use crate::timezone::validate_timezone;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

#[async_trait]
impl TenantRepository for SqliteRepository {
    async fn add_tenant(&self, name: String, timezone: Option<String>) -> Result<Tenant, CoreError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::InvalidInput("Tenant name cannot be empty".to_string()));
        }
        if let Some(tz) = &timezone {
            validate_timezone(tz)?;
        }

        let now = Utc::now();
        let tenant = Tenant {
            id: Uuid::now_v7(),
            name,
            timezone,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO tenants (id, name, timezone, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.timezone)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .execute(self.pool())
        .await?;

        tracing::info!(tenant_id = %tenant.id, name = %tenant.name, "Tenant created");
        Ok(tenant)
    }

    async fn find_tenant_by_id(&self, id: Uuid) -> Result<Option<Tenant>, CoreError> {
        let tenant = sqlx::query_as("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(tenant)
    }

    async fn find_tenants(&self) -> Result<Vec<Tenant>, CoreError> {
        let tenants = sqlx::query_as("SELECT * FROM tenants ORDER BY name")
            .fetch_all(self.pool())
            .await?;
        Ok(tenants)
    }

    async fn set_tenant_timezone(&self, id: Uuid, timezone: Option<String>) -> Result<Tenant, CoreError> {
        if let Some(tz) = &timezone {
            validate_timezone(tz)?;
        }

        let result = sqlx::query("UPDATE tenants SET timezone = $1, updated_at = $2 WHERE id = $3")
            .bind(&timezone)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Tenant with id {} not found", id)));
        }

        self.find_tenant_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Tenant with id {} not found", id)))
    }
}
