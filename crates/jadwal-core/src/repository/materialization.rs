use crate::error::{is_unique_violation, CoreError};
use crate::models::{
    AttendanceState, ClassSession, DateRange, MaterializationSummary, OccurrenceFilter, Schedule,
    SessionStatus,
};
use crate::recurrence::{RecurrenceExpander, RuleFiring};
use crate::repository::{
    MaterializationRepository, RuleRepository, ScheduleRepository, SqliteRepository,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::time::Instant;
use uuid::Uuid;

#[async_trait]
impl MaterializationRepository for SqliteRepository {
    async fn ensure_for_date(&self, tenant_id: Uuid, schedule_id: Uuid, date: NaiveDate) -> Result<bool, CoreError> {
        let created = self.ensure_for_range(tenant_id, schedule_id, date, date).await?;
        Ok(created > 0)
    }

    #[tracing::instrument(skip(self), fields(created = tracing::field::Empty))]
    async fn ensure_for_range(&self, tenant_id: Uuid, schedule_id: Uuid, from: NaiveDate, to: NaiveDate) -> Result<usize, CoreError> {
        let range = DateRange::new(from, to)?;
        range.ensure_at_most(self.config().max_range_days)?;

        let schedule = self
            .find_schedule_by_id(tenant_id, schedule_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Schedule with id {} not found", schedule_id)))?;

        let created = self.materialize_schedule(&schedule, range).await?;
        tracing::Span::current().record("created", created);
        Ok(created)
    }

    #[tracing::instrument(skip(self))]
    async fn ensure_tenant_for_range(&self, tenant_id: Uuid, section_id: Option<Uuid>, from: NaiveDate, to: NaiveDate) -> Result<MaterializationSummary, CoreError> {
        let start_time = Instant::now();
        let range = DateRange::new(from, to)?;
        range.ensure_at_most(self.config().max_range_days)?;

        let filter = OccurrenceFilter {
            schedule_id: None,
            section_id,
        };
        let schedules = self.find_active_schedules(tenant_id, &filter).await?;

        let mut summary = MaterializationSummary::default();
        for schedule in &schedules {
            summary.schedules_processed += 1;
            match self.materialize_schedule(schedule, range).await {
                Ok(created) => summary.sessions_created += created,
                Err(CoreError::MaterializationAborted { date, created, source }) => {
                    summary.sessions_created += created;
                    summary.schedules_with_errors += 1;
                    summary
                        .errors
                        .push(format!("Schedule {} stopped at {}: {}", schedule.id, date, source));
                }
                Err(e) => {
                    summary.schedules_with_errors += 1;
                    summary.errors.push(format!("Schedule {}: {}", schedule.id, e));
                }
            }
        }

        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        tracing::info!(
            schedules = summary.schedules_processed,
            created = summary.sessions_created,
            failed = summary.schedules_with_errors,
            duration_ms = summary.duration_ms,
            "Tenant materialization finished"
        );
        Ok(summary)
    }
}

impl SqliteRepository {
    /// Creates the missing sessions of one schedule inside `range`.
    ///
    /// Each date is its own statement; a storage failure stops the walk and
    /// leaves earlier dates committed.
    async fn materialize_schedule(&self, schedule: &Schedule, range: DateRange) -> Result<usize, CoreError> {
        if !schedule.is_materializable() {
            tracing::debug!(schedule_id = %schedule.id, status = %schedule.status, "Schedule not materializable, skipping");
            return Ok(0);
        }

        let Some(range) = schedule.date_range().intersect(&range) else {
            return Ok(0);
        };

        let zone = self.tenant_zone(schedule.tenant_id).await?;
        let rules = self
            .find_active_rules_for_schedule(schedule.tenant_id, schedule.id)
            .await?;
        let expander = RecurrenceExpander::new(schedule, rules, zone)?;

        let mut created = 0;
        for firing in expander.daily_firings_between(range)? {
            match self.materialize_firing(schedule, &firing).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(schedule_id = %schedule.id, date = %firing.date, error = %e, "Materialization aborted");
                    return Err(CoreError::MaterializationAborted {
                        date: firing.date,
                        created,
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(created)
    }

    /// Inserts the session for one firing unless a row for the date already
    /// exists. Soft-deleted rows count as existing.
    async fn materialize_firing(&self, schedule: &Schedule, firing: &RuleFiring) -> Result<bool, CoreError> {
        let existing: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM class_sessions WHERE schedule_id = $1 AND session_date = $2",
        )
        .bind(schedule.id)
        .bind(firing.date)
        .fetch_optional(self.pool())
        .await?;

        if existing.is_some() {
            tracing::debug!(schedule_id = %schedule.id, date = %firing.date, "Session already exists");
            return Ok(false);
        }

        self.insert_session(schedule, firing).await
    }

    async fn insert_session(&self, schedule: &Schedule, firing: &RuleFiring) -> Result<bool, CoreError> {
        let now = Utc::now();
        let session = ClassSession {
            id: Uuid::now_v7(),
            tenant_id: schedule.tenant_id,
            schedule_id: Some(schedule.id),
            rule_id: Some(firing.rule_id),
            section_id: schedule.section_id,
            session_date: firing.date,
            starts_at: firing.starts_at,
            ends_at: firing.ends_at,
            status: SessionStatus::Scheduled,
            attendance_state: AttendanceState::Open,
            notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let result = sqlx::query(
            r#"INSERT INTO class_sessions (id, tenant_id, schedule_id, rule_id, section_id, session_date, starts_at, ends_at, status, attendance_state, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
        )
        .bind(session.id)
        .bind(session.tenant_id)
        .bind(session.schedule_id)
        .bind(session.rule_id)
        .bind(session.section_id)
        .bind(session.session_date)
        .bind(session.starts_at)
        .bind(session.ends_at)
        .bind(session.status)
        .bind(session.attendance_state)
        .bind(&session.notes)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(self.pool())
        .await;

        match result {
            Ok(_) => {
                tracing::debug!(schedule_id = %schedule.id, date = %firing.date, session_id = %session.id, "Session created");
                Ok(true)
            }
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!(schedule_id = %schedule.id, date = %firing.date, "Session created concurrently, skipping");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
