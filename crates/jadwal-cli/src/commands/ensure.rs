use anyhow::{anyhow, Result};
use jadwal_core::repository::{MaterializationRepository, Repository};
use jadwal_core::timezone::TenantZone;
use owo_colors::{OwoColorize, Style};
use uuid::Uuid;

use crate::cli::EnsureCommand;
use crate::parser::{parse_date, parse_uuid};
use crate::util::resolve_schedule;

pub async fn ensure_sessions(
    repo: &impl Repository,
    tenant_id: Uuid,
    zone: TenantZone,
    command: EnsureCommand,
) -> Result<()> {
    let (from, to) = match (&command.date, &command.from, &command.to) {
        (Some(date), _, _) => {
            let date = parse_date(date, &zone)?;
            (date, date)
        }
        (None, Some(from), Some(to)) => (parse_date(from, &zone)?, parse_date(to, &zone)?),
        _ => return Err(anyhow!("Pass either --date or both --from and --to")),
    };

    let success_style = Style::new().green().bold();

    if let Some(key) = &command.schedule {
        let schedule = resolve_schedule(repo, tenant_id, key).await?;
        let created = repo.ensure_for_range(tenant_id, schedule.id, from, to).await?;
        println!(
            "{} Created {} session(s) for {} between {} and {}",
            "✓".style(success_style),
            created,
            schedule.slug.as_deref().map(str::to_string).unwrap_or_else(|| schedule.id.to_string()),
            from,
            to
        );
        return Ok(());
    }

    let section_id = command
        .section
        .as_deref()
        .map(|s| parse_uuid(s, "section"))
        .transpose()?;
    let summary = repo.ensure_tenant_for_range(tenant_id, section_id, from, to).await?;

    println!(
        "{} Created {} session(s) across {} schedule(s) in {}ms",
        "✓".style(success_style),
        summary.sessions_created,
        summary.schedules_processed,
        summary.duration_ms
    );

    if summary.schedules_with_errors > 0 {
        for error in &summary.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(anyhow!(
            "{} schedule(s) could not be fully materialized",
            summary.schedules_with_errors
        ));
    }

    Ok(())
}
