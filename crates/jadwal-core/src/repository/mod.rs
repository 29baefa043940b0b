use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    ClassSession, MaterializationConfig, MaterializationSummary, NewRuleData, NewScheduleData,
    OccurrenceFilter, ProjectedOccurrence, Schedule, ScheduleRule, Tenant, UpdateRuleData,
    UpdateScheduleData, UpdateSessionData,
};
use crate::timezone::TenantZone;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

// Re-export domain modules
pub mod tenants;
pub mod schedules;
pub mod rules;
pub mod sessions;
pub mod materialization;
pub mod calendar;

/// Domain-specific trait for tenant operations
#[async_trait]
pub trait TenantRepository {
    async fn add_tenant(&self, name: String, timezone: Option<String>) -> Result<Tenant, CoreError>;
    async fn find_tenant_by_id(&self, id: Uuid) -> Result<Option<Tenant>, CoreError>;
    async fn find_tenants(&self) -> Result<Vec<Tenant>, CoreError>;
    async fn set_tenant_timezone(&self, id: Uuid, timezone: Option<String>) -> Result<Tenant, CoreError>;
}

/// Domain-specific trait for schedule operations. Every read filters out
/// soft-deleted rows.
#[async_trait]
pub trait ScheduleRepository {
    async fn create_schedule(&self, data: NewScheduleData) -> Result<Schedule, CoreError>;
    async fn find_schedule_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Schedule>, CoreError>;
    async fn find_schedule_by_slug(&self, tenant_id: Uuid, slug: &str) -> Result<Option<Schedule>, CoreError>;
    async fn find_schedules(&self, tenant_id: Uuid, section_id: Option<Uuid>) -> Result<Vec<Schedule>, CoreError>;
    async fn find_active_schedules(&self, tenant_id: Uuid, filter: &OccurrenceFilter) -> Result<Vec<Schedule>, CoreError>;
    async fn update_schedule(&self, tenant_id: Uuid, id: Uuid, data: UpdateScheduleData) -> Result<Schedule, CoreError>;
    async fn delete_schedule(&self, tenant_id: Uuid, id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for schedule rule operations
#[async_trait]
pub trait RuleRepository {
    async fn add_rule(&self, tenant_id: Uuid, schedule_id: Uuid, data: NewRuleData) -> Result<ScheduleRule, CoreError>;
    async fn find_rule_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<ScheduleRule>, CoreError>;
    async fn find_rules_for_schedule(&self, tenant_id: Uuid, schedule_id: Uuid) -> Result<Vec<ScheduleRule>, CoreError>;
    async fn find_active_rules_for_schedule(&self, tenant_id: Uuid, schedule_id: Uuid) -> Result<Vec<ScheduleRule>, CoreError>;
    async fn update_rule(&self, tenant_id: Uuid, id: Uuid, data: UpdateRuleData) -> Result<ScheduleRule, CoreError>;
    async fn delete_rule(&self, tenant_id: Uuid, id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for materialized class sessions, as consumed by the
/// attendance workflow
#[async_trait]
pub trait SessionRepository {
    async fn find_session_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<ClassSession>, CoreError>;
    async fn find_session_for_date(&self, tenant_id: Uuid, schedule_id: Uuid, date: NaiveDate) -> Result<Option<ClassSession>, CoreError>;
    async fn find_sessions(&self, tenant_id: Uuid, filter: &OccurrenceFilter, from: NaiveDate, to: NaiveDate) -> Result<Vec<ClassSession>, CoreError>;
    async fn update_session(&self, tenant_id: Uuid, id: Uuid, data: UpdateSessionData) -> Result<ClassSession, CoreError>;
    async fn cancel_session(&self, tenant_id: Uuid, id: Uuid) -> Result<ClassSession, CoreError>;
    async fn delete_session(&self, tenant_id: Uuid, id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for materialization operations
#[async_trait]
pub trait MaterializationRepository {
    async fn ensure_for_date(&self, tenant_id: Uuid, schedule_id: Uuid, date: NaiveDate) -> Result<bool, CoreError>;
    async fn ensure_for_range(&self, tenant_id: Uuid, schedule_id: Uuid, from: NaiveDate, to: NaiveDate) -> Result<usize, CoreError>;
    async fn ensure_tenant_for_range(&self, tenant_id: Uuid, section_id: Option<Uuid>, from: NaiveDate, to: NaiveDate) -> Result<MaterializationSummary, CoreError>;
}

/// Domain-specific trait for read-only calendar projection
#[async_trait]
pub trait CalendarRepository {
    async fn list_occurrences(&self, tenant_id: Uuid, filter: &OccurrenceFilter, from: NaiveDate, to: NaiveDate) -> Result<Vec<ProjectedOccurrence>, CoreError>;
}

/// Main repository trait that composes all domain traits
#[async_trait]
pub trait Repository:
    TenantRepository +
    ScheduleRepository +
    RuleRepository +
    SessionRepository +
    MaterializationRepository +
    CalendarRepository
{
    // This trait automatically composes all domain-specific repositories
    // Individual domain operations are defined in their respective traits
}

/// SQLite implementation of the repository pattern
pub struct SqliteRepository {
    pool: DbPool,
    config: MaterializationConfig,
}

impl SqliteRepository {
    pub fn new(pool: DbPool, config: MaterializationConfig) -> Self {
        Self { pool, config }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn config(&self) -> &MaterializationConfig {
        &self.config
    }

    /// Loads the tenant and resolves the zone its schedule times are read in.
    pub(crate) async fn tenant_zone(&self, tenant_id: Uuid) -> Result<TenantZone, CoreError> {
        let tenant = self
            .find_tenant_by_id(tenant_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Tenant with id {} not found", tenant_id)))?;
        Ok(TenantZone::resolve(
            tenant.timezone.as_deref(),
            self.config.fallback_offset,
        ))
    }
}

impl Repository for SqliteRepository {}
