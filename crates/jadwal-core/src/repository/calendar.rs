use crate::error::CoreError;
use crate::models::{DateRange, OccurrenceFilter, ProjectedOccurrence};
use crate::recurrence::RecurrenceExpander;
use crate::repository::{CalendarRepository, RuleRepository, ScheduleRepository, SqliteRepository};
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

#[async_trait]
impl CalendarRepository for SqliteRepository {
    /// Projects rule firings for display without touching `class_sessions`.
    #[tracing::instrument(skip(self, filter), fields(schedule = ?filter.schedule_id, section = ?filter.section_id))]
    async fn list_occurrences(&self, tenant_id: Uuid, filter: &OccurrenceFilter, from: NaiveDate, to: NaiveDate) -> Result<Vec<ProjectedOccurrence>, CoreError> {
        let window = DateRange::new(from, to)?;
        window.ensure_at_most(self.config().max_window_days)?;

        let zone = self.tenant_zone(tenant_id).await?;
        if let Some(schedule_id) = filter.schedule_id {
            self.find_schedule_by_id(tenant_id, schedule_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Schedule with id {} not found", schedule_id)))?;
        }
        let schedules = self.find_active_schedules(tenant_id, filter).await?;

        let mut occurrences = Vec::new();
        for schedule in schedules.into_iter().filter(|s| s.is_materializable()) {
            if schedule.date_range().intersect(&window).is_none() {
                continue;
            }

            let rules = self
                .find_active_rules_for_schedule(tenant_id, schedule.id)
                .await?;
            let expander = RecurrenceExpander::new(&schedule, rules, zone)?;

            for firing in expander.firings_between(window)? {
                occurrences.push(ProjectedOccurrence {
                    date: firing.date,
                    schedule: schedule.clone(),
                    rule_id: firing.rule_id,
                    start_time: firing.start_time,
                    end_time: firing.end_time,
                    starts_at: firing.starts_at,
                    ends_at: firing.ends_at,
                });
            }
        }

        occurrences.sort_by(|a, b| {
            (a.date, a.start_time, a.schedule.id).cmp(&(b.date, b.start_time, b.schedule.id))
        });

        tracing::debug!(count = occurrences.len(), "Occurrences projected");
        Ok(occurrences)
    }
}
