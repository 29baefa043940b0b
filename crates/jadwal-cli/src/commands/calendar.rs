use anyhow::Result;
use jadwal_core::models::OccurrenceFilter;
use jadwal_core::repository::{CalendarRepository, Repository};
use jadwal_core::timezone::TenantZone;
use uuid::Uuid;

use crate::cli::CalendarCommand;
use crate::parser::{parse_date, parse_uuid};
use crate::util::resolve_schedule;
use crate::views::table::display_occurrences;

/// Builds the listing filter shared by `calendar` and `session list`.
pub async fn occurrence_filter(
    repo: &impl Repository,
    tenant_id: Uuid,
    schedule: Option<&str>,
    section: Option<&str>,
) -> Result<OccurrenceFilter> {
    let schedule_id = match schedule {
        Some(key) => Some(resolve_schedule(repo, tenant_id, key).await?.id),
        None => None,
    };
    Ok(OccurrenceFilter {
        schedule_id,
        section_id: section.map(|s| parse_uuid(s, "section")).transpose()?,
    })
}

pub async fn show_calendar(
    repo: &impl Repository,
    tenant_id: Uuid,
    zone: TenantZone,
    command: CalendarCommand,
) -> Result<()> {
    let from = parse_date(&command.from, &zone)?;
    let to = parse_date(&command.to, &zone)?;
    let filter = occurrence_filter(repo, tenant_id, command.schedule.as_deref(), command.section.as_deref()).await?;

    let occurrences = repo.list_occurrences(tenant_id, &filter, from, to).await?;
    display_occurrences(&occurrences, &zone);
    Ok(())
}
