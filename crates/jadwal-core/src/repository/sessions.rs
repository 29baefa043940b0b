use crate::error::CoreError;
use crate::models::{ClassSession, DateRange, OccurrenceFilter, SessionStatus, UpdateSessionData};
use crate::repository::{SessionRepository, SqliteRepository};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

#[async_trait]
impl SessionRepository for SqliteRepository {
    async fn find_session_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<ClassSession>, CoreError> {
        let session = sqlx::query_as(
            "SELECT * FROM class_sessions WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(session)
    }

    async fn find_session_for_date(&self, tenant_id: Uuid, schedule_id: Uuid, date: NaiveDate) -> Result<Option<ClassSession>, CoreError> {
        let session = sqlx::query_as(
            r#"SELECT * FROM class_sessions
            WHERE tenant_id = $1 AND schedule_id = $2 AND session_date = $3 AND deleted_at IS NULL"#,
        )
        .bind(tenant_id)
        .bind(schedule_id)
        .bind(date)
        .fetch_optional(self.pool())
        .await?;
        Ok(session)
    }

    async fn find_sessions(&self, tenant_id: Uuid, filter: &OccurrenceFilter, from: NaiveDate, to: NaiveDate) -> Result<Vec<ClassSession>, CoreError> {
        let range = DateRange::new(from, to)?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT * FROM class_sessions WHERE deleted_at IS NULL AND tenant_id = ",
        );
        qb.push_bind(tenant_id);
        qb.push(" AND session_date BETWEEN ");
        qb.push_bind(range.start);
        qb.push(" AND ");
        qb.push_bind(range.end);
        if let Some(schedule_id) = filter.schedule_id {
            qb.push(" AND schedule_id = ");
            qb.push_bind(schedule_id);
        }
        if let Some(section_id) = filter.section_id {
            qb.push(" AND section_id = ");
            qb.push_bind(section_id);
        }
        qb.push(" ORDER BY session_date, starts_at, id");

        let sessions = qb.build_query_as().fetch_all(self.pool()).await?;
        Ok(sessions)
    }

    async fn update_session(&self, tenant_id: Uuid, id: Uuid, data: UpdateSessionData) -> Result<ClassSession, CoreError> {
        let mut tx = self.pool().begin().await?;

        let exists: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM class_sessions WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Err(CoreError::NotFound(format!("Session with id {} not found", id)));
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE class_sessions SET updated_at = ");
        qb.push_bind(Utc::now());

        if let Some(status) = data.status {
            qb.push(", status = ");
            qb.push_bind(status);
        }
        if let Some(state) = data.attendance_state {
            qb.push(", attendance_state = ");
            qb.push_bind(state);
        }
        if let Some(notes) = data.notes.into_update() {
            qb.push(", notes = ");
            qb.push_bind(notes);
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.build().execute(&mut *tx).await?;

        let updated: ClassSession = sqlx::query_as("SELECT * FROM class_sessions WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn cancel_session(&self, tenant_id: Uuid, id: Uuid) -> Result<ClassSession, CoreError> {
        let session = self
            .update_session(
                tenant_id,
                id,
                UpdateSessionData {
                    status: Some(SessionStatus::Canceled),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(session_id = %id, date = %session.session_date, "Session canceled");
        Ok(session)
    }

    async fn delete_session(&self, tenant_id: Uuid, id: Uuid) -> Result<(), CoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE class_sessions SET deleted_at = $1, updated_at = $1 WHERE tenant_id = $2 AND id = $3 AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(tenant_id)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Session with id {} not found", id)));
        }

        tracing::info!(session_id = %id, "Session soft-deleted");
        Ok(())
    }
}
