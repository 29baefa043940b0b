use crate::error::CoreError;
use crate::models::{
    encode_weeks_of_month, NewRuleData, ScheduleRule, ScheduleRuleRow, UpdateRuleData,
};
use crate::recurrence::{validate_rule, validate_weeks_of_month};
use crate::repository::{RuleRepository, ScheduleRepository, SqliteRepository};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, Transaction};
use uuid::Uuid;

impl SqliteRepository {
    /// Inserts a validated rule inside an existing transaction
    pub(crate) async fn insert_rule_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        tenant_id: Uuid,
        schedule_id: Uuid,
        data: NewRuleData,
    ) -> Result<ScheduleRule, CoreError> {
        validate_rule(&data)?;

        let now = Utc::now();
        let mut weeks_of_month = data.weeks_of_month;
        weeks_of_month.sort_unstable();
        weeks_of_month.dedup();

        let rule = ScheduleRule {
            id: Uuid::now_v7(),
            tenant_id,
            schedule_id,
            day_of_week: data.day_of_week,
            start_time: data.start_time,
            end_time: data.end_time,
            interval_weeks: data.interval_weeks.unwrap_or(1),
            start_offset_weeks: data.start_offset_weeks.unwrap_or(0),
            week_parity: data.week_parity.unwrap_or_default(),
            weeks_of_month,
            last_week_of_month: data.last_week_of_month,
            room_id: data.room_id,
            teacher_id: data.teacher_id,
            notes: data.notes,
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        sqlx::query(
            r#"INSERT INTO class_schedule_rules (id, tenant_id, schedule_id, day_of_week, start_time, end_time, interval_weeks, start_offset_weeks, week_parity, weeks_of_month, last_week_of_month, room_id, teacher_id, notes, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"#,
        )
        .bind(rule.id)
        .bind(rule.tenant_id)
        .bind(rule.schedule_id)
        .bind(i64::from(rule.day_of_week))
        .bind(rule.start_time)
        .bind(rule.end_time)
        .bind(i64::from(rule.interval_weeks))
        .bind(i64::from(rule.start_offset_weeks))
        .bind(rule.week_parity)
        .bind(encode_weeks_of_month(&rule.weeks_of_month)?)
        .bind(rule.last_week_of_month)
        .bind(rule.room_id)
        .bind(rule.teacher_id)
        .bind(&rule.notes)
        .bind(rule.is_active)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(rule)
    }

    async fn fetch_rules(
        &self,
        tenant_id: Uuid,
        schedule_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<ScheduleRule>, CoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT * FROM class_schedule_rules WHERE deleted_at IS NULL AND tenant_id = ",
        );
        qb.push_bind(tenant_id);
        qb.push(" AND schedule_id = ");
        qb.push_bind(schedule_id);
        if active_only {
            qb.push(" AND is_active = 1");
        }
        qb.push(" ORDER BY day_of_week, start_time, id");

        let rows: Vec<ScheduleRuleRow> = qb.build_query_as().fetch_all(self.pool()).await?;
        rows.into_iter().map(ScheduleRule::try_from).collect()
    }
}

#[async_trait]
impl RuleRepository for SqliteRepository {
    async fn add_rule(&self, tenant_id: Uuid, schedule_id: Uuid, data: NewRuleData) -> Result<ScheduleRule, CoreError> {
        validate_rule(&data)?;

        if self.find_schedule_by_id(tenant_id, schedule_id).await?.is_none() {
            return Err(CoreError::NotFound(format!(
                "Schedule with id {} not found",
                schedule_id
            )));
        }

        let mut tx = self.pool().begin().await?;
        let rule = Self::insert_rule_in_transaction(&mut tx, tenant_id, schedule_id, data).await?;
        tx.commit().await?;

        tracing::info!(rule_id = %rule.id, schedule_id = %schedule_id, day_of_week = rule.day_of_week, "Rule added");
        Ok(rule)
    }

    async fn find_rule_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<ScheduleRule>, CoreError> {
        let row: Option<ScheduleRuleRow> = sqlx::query_as(
            "SELECT * FROM class_schedule_rules WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(ScheduleRule::try_from).transpose()
    }

    async fn find_rules_for_schedule(&self, tenant_id: Uuid, schedule_id: Uuid) -> Result<Vec<ScheduleRule>, CoreError> {
        self.fetch_rules(tenant_id, schedule_id, false).await
    }

    async fn find_active_rules_for_schedule(&self, tenant_id: Uuid, schedule_id: Uuid) -> Result<Vec<ScheduleRule>, CoreError> {
        self.fetch_rules(tenant_id, schedule_id, true).await
    }

    async fn update_rule(&self, tenant_id: Uuid, id: Uuid, data: UpdateRuleData) -> Result<ScheduleRule, CoreError> {
        if data.interval_weeks == Some(0) {
            return Err(CoreError::InvalidInput(
                "interval_weeks must be at least 1".to_string(),
            ));
        }
        if let crate::patch::Patch::SetValue(weeks) = &data.weeks_of_month {
            validate_weeks_of_month(weeks)?;
        }

        let mut tx = self.pool().begin().await?;

        let exists: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM class_schedule_rules WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Err(CoreError::NotFound(format!("Rule with id {} not found", id)));
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE class_schedule_rules SET updated_at = ");
        qb.push_bind(Utc::now());

        if let Some(interval) = data.interval_weeks {
            qb.push(", interval_weeks = ");
            qb.push_bind(i64::from(interval));
        }
        if let Some(offset) = data.start_offset_weeks {
            qb.push(", start_offset_weeks = ");
            qb.push_bind(i64::from(offset));
        }
        if let Some(parity) = data.week_parity {
            qb.push(", week_parity = ");
            qb.push_bind(parity);
        }
        if let Some(weeks) = data.weeks_of_month.into_update() {
            qb.push(", weeks_of_month = ");
            qb.push_bind(match weeks {
                Some(weeks) => encode_weeks_of_month(&weeks)?,
                None => None,
            });
        }
        if let Some(last_week) = data.last_week_of_month {
            qb.push(", last_week_of_month = ");
            qb.push_bind(last_week);
        }
        if let Some(room_id) = data.room_id.into_update() {
            qb.push(", room_id = ");
            qb.push_bind(room_id);
        }
        if let Some(teacher_id) = data.teacher_id.into_update() {
            qb.push(", teacher_id = ");
            qb.push_bind(teacher_id);
        }
        if let Some(notes) = data.notes.into_update() {
            qb.push(", notes = ");
            qb.push_bind(notes);
        }
        if let Some(is_active) = data.is_active {
            qb.push(", is_active = ");
            qb.push_bind(is_active);
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.build().execute(&mut *tx).await?;

        let row: ScheduleRuleRow = sqlx::query_as("SELECT * FROM class_schedule_rules WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        ScheduleRule::try_from(row)
    }

    async fn delete_rule(&self, tenant_id: Uuid, id: Uuid) -> Result<(), CoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE class_schedule_rules SET deleted_at = $1, updated_at = $1 WHERE tenant_id = $2 AND id = $3 AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(tenant_id)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Rule with id {} not found", id)));
        }

        tracing::info!(rule_id = %id, "Rule soft-deleted");
        Ok(())
    }
}
