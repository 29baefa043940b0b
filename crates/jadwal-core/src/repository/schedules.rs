use crate::error::{is_unique_violation, CoreError};
use crate::models::{
    DateRange, NewScheduleData, OccurrenceFilter, Schedule, ScheduleStatus, UpdateScheduleData,
};
use crate::patch::Patch;
use crate::recurrence::validate_rule;
use crate::repository::{ScheduleRepository, SqliteRepository, TenantRepository};
use crate::slug::generate_slug;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

fn normalize_slug(raw: &str) -> Result<String, CoreError> {
    let slug = generate_slug(raw);
    if slug.is_empty() {
        return Err(CoreError::InvalidInput(format!(
            "Slug '{}' has no usable characters",
            raw
        )));
    }
    Ok(slug)
}

fn slug_conflict(err: sqlx::Error, slug: Option<&str>) -> CoreError {
    if is_unique_violation(&err) {
        CoreError::Conflict(format!(
            "A schedule with slug '{}' already exists",
            slug.unwrap_or_default()
        ))
    } else {
        CoreError::Database(err)
    }
}

#[async_trait]
impl ScheduleRepository for SqliteRepository {
    async fn create_schedule(&self, data: NewScheduleData) -> Result<Schedule, CoreError> {
        // Everything that can be checked without I/O is checked first.
        DateRange::new(data.start_date, data.end_date)?;
        for rule in &data.rules {
            validate_rule(rule)?;
        }
        let slug = data.slug.as_deref().map(normalize_slug).transpose()?;

        if self.find_tenant_by_id(data.tenant_id).await?.is_none() {
            return Err(CoreError::NotFound(format!(
                "Tenant with id {} not found",
                data.tenant_id
            )));
        }

        let mut tx = self.pool().begin().await?;

        let now = Utc::now();
        let schedule = Schedule {
            id: Uuid::now_v7(),
            tenant_id: data.tenant_id,
            section_id: data.section_id,
            slug,
            start_date: data.start_date,
            end_date: data.end_date,
            status: data.status.unwrap_or(ScheduleStatus::Scheduled),
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        sqlx::query(
            r#"INSERT INTO class_schedules (id, tenant_id, section_id, slug, start_date, end_date, status, is_active, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(schedule.id)
        .bind(schedule.tenant_id)
        .bind(schedule.section_id)
        .bind(&schedule.slug)
        .bind(schedule.start_date)
        .bind(schedule.end_date)
        .bind(schedule.status)
        .bind(schedule.is_active)
        .bind(schedule.created_at)
        .bind(schedule.updated_at)
        .bind(schedule.deleted_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| slug_conflict(e, schedule.slug.as_deref()))?;

        for rule in data.rules {
            Self::insert_rule_in_transaction(&mut tx, schedule.tenant_id, schedule.id, rule).await?;
        }

        tx.commit().await?;

        tracing::info!(
            schedule_id = %schedule.id,
            tenant_id = %schedule.tenant_id,
            range = %schedule.date_range(),
            "Schedule created"
        );
        Ok(schedule)
    }

    async fn find_schedule_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Schedule>, CoreError> {
        let schedule = sqlx::query_as(
            "SELECT * FROM class_schedules WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(schedule)
    }

    async fn find_schedule_by_slug(&self, tenant_id: Uuid, slug: &str) -> Result<Option<Schedule>, CoreError> {
        let schedule = sqlx::query_as(
            "SELECT * FROM class_schedules WHERE tenant_id = $1 AND slug = $2 AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .bind(generate_slug(slug))
        .fetch_optional(self.pool())
        .await?;
        Ok(schedule)
    }

    async fn find_schedules(&self, tenant_id: Uuid, section_id: Option<Uuid>) -> Result<Vec<Schedule>, CoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT * FROM class_schedules WHERE deleted_at IS NULL AND tenant_id = ",
        );
        qb.push_bind(tenant_id);
        if let Some(section_id) = section_id {
            qb.push(" AND section_id = ");
            qb.push_bind(section_id);
        }
        qb.push(" ORDER BY start_date, created_at");

        let schedules = qb.build_query_as().fetch_all(self.pool()).await?;
        Ok(schedules)
    }

    async fn find_active_schedules(&self, tenant_id: Uuid, filter: &OccurrenceFilter) -> Result<Vec<Schedule>, CoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT * FROM class_schedules WHERE is_active = 1 AND deleted_at IS NULL AND tenant_id = ",
        );
        qb.push_bind(tenant_id);
        if let Some(schedule_id) = filter.schedule_id {
            qb.push(" AND id = ");
            qb.push_bind(schedule_id);
        }
        if let Some(section_id) = filter.section_id {
            qb.push(" AND section_id = ");
            qb.push_bind(section_id);
        }
        qb.push(" ORDER BY start_date, id");

        let schedules = qb.build_query_as().fetch_all(self.pool()).await?;
        Ok(schedules)
    }

    async fn update_schedule(&self, tenant_id: Uuid, id: Uuid, data: UpdateScheduleData) -> Result<Schedule, CoreError> {
        let mut tx = self.pool().begin().await?;

        let current: Schedule = sqlx::query_as(
            "SELECT * FROM class_schedules WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Schedule with id {} not found", id)))?;

        DateRange::new(
            data.start_date.unwrap_or(current.start_date),
            data.end_date.unwrap_or(current.end_date),
        )?;

        let slug_update = match data.slug {
            Patch::Unset => None,
            Patch::SetNull => Some(None),
            Patch::SetValue(raw) => Some(Some(normalize_slug(&raw)?)),
        };

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE class_schedules SET updated_at = ");
        qb.push_bind(Utc::now());

        if let Some(slug) = &slug_update {
            qb.push(", slug = ");
            qb.push_bind(slug.clone());
        }
        if let Some(start_date) = data.start_date {
            qb.push(", start_date = ");
            qb.push_bind(start_date);
        }
        if let Some(end_date) = data.end_date {
            qb.push(", end_date = ");
            qb.push_bind(end_date);
        }
        if let Some(status) = data.status {
            qb.push(", status = ");
            qb.push_bind(status);
        }
        if let Some(is_active) = data.is_active {
            qb.push(", is_active = ");
            qb.push_bind(is_active);
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" AND tenant_id = ");
        qb.push_bind(tenant_id);

        let conflict_slug = slug_update.clone().flatten();
        qb.build()
            .execute(&mut *tx)
            .await
            .map_err(|e| slug_conflict(e, conflict_slug.as_deref()))?;

        let updated: Schedule = sqlx::query_as("SELECT * FROM class_schedules WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_schedule(&self, tenant_id: Uuid, id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE class_schedules SET deleted_at = $1, updated_at = $1 WHERE tenant_id = $2 AND id = $3 AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(tenant_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Schedule with id {} not found", id)));
        }

        // Rules go with their schedule; sessions stay as the attendance record.
        let rules = sqlx::query(
            "UPDATE class_schedule_rules SET deleted_at = $1, updated_at = $1 WHERE schedule_id = $2 AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(schedule_id = %id, rules_deleted = rules.rows_affected(), "Schedule soft-deleted");
        Ok(())
    }
}
