use anyhow::{anyhow, Result};
use dialoguer::Confirm;
use jadwal_core::models::{NewRuleData, NewScheduleData, UpdateScheduleData};
use jadwal_core::recurrence::{uses_parity, RecurrenceExpander};
use jadwal_core::repository::{Repository, RuleRepository, ScheduleRepository};
use jadwal_core::timezone::TenantZone;
use owo_colors::{OwoColorize, Style};
use uuid::Uuid;

use crate::cli::{AddScheduleCommand, EditScheduleCommand, ScheduleAction};
use crate::parser::{parse_date, parse_day_of_week, parse_time, parse_uuid};
use crate::util::{patch_from, resolve_schedule};
use crate::views::table::{display_preview, display_rules, display_schedules};

pub async fn schedule_command(
    repo: &impl Repository,
    tenant_id: Uuid,
    zone: TenantZone,
    action: ScheduleAction,
) -> Result<()> {
    match action {
        ScheduleAction::Add(command) => add_schedule(repo, tenant_id, &zone, command).await,
        ScheduleAction::List { section } => {
            let section_id = section.as_deref().map(|s| parse_uuid(s, "section")).transpose()?;
            let schedules = repo.find_schedules(tenant_id, section_id).await?;
            display_schedules(&schedules);
            Ok(())
        }
        ScheduleAction::Show { schedule, preview } => {
            show_schedule(repo, tenant_id, zone, &schedule, preview).await
        }
        ScheduleAction::Edit(command) => edit_schedule(repo, tenant_id, &zone, command).await,
        ScheduleAction::Delete { schedule, force } => {
            let schedule = resolve_schedule(repo, tenant_id, &schedule).await?;
            let label = schedule.slug.clone().unwrap_or_else(|| schedule.id.to_string());

            if !force {
                let confirmation = Confirm::new()
                    .with_prompt(format!(
                        "Are you sure you want to delete schedule '{}'? Its sessions are kept.",
                        label
                    ))
                    .default(false)
                    .interact()
                    .unwrap_or(false);

                if !confirmation {
                    println!("Deletion cancelled.");
                    return Ok(());
                }
            }

            repo.delete_schedule(tenant_id, schedule.id).await?;
            println!("{} Deleted schedule '{}'", "✓".green().bold(), label);
            Ok(())
        }
    }
}

async fn add_schedule(
    repo: &impl Repository,
    tenant_id: Uuid,
    zone: &TenantZone,
    command: AddScheduleCommand,
) -> Result<()> {
    let mut rules = Vec::new();
    if let (Some(day), Some(start), Some(end)) = (&command.day, &command.start, &command.end) {
        rules.push(NewRuleData {
            day_of_week: parse_day_of_week(day)?,
            start_time: parse_time(start)?,
            end_time: parse_time(end)?,
            ..Default::default()
        });
    }

    let data = NewScheduleData {
        tenant_id,
        section_id: parse_uuid(&command.section, "section")?,
        slug: command.slug,
        start_date: parse_date(&command.from, zone)?,
        end_date: parse_date(&command.to, zone)?,
        status: command.status,
        rules,
    };

    let schedule = repo.create_schedule(data).await?;
    let success_style = Style::new().green().bold();
    println!(
        "{} Created schedule {} (ID: {})",
        "✓".style(success_style),
        schedule.slug.as_deref().unwrap_or("(no slug)").bold(),
        schedule.id
    );
    println!("  {} Valid {}", "→".blue(), schedule.date_range());

    let rules = repo.find_rules_for_schedule(tenant_id, schedule.id).await?;
    if rules.is_empty() {
        println!(
            "  {} No rules yet; add one with `jadwal rule add {}`",
            "→".blue(),
            schedule.slug.as_deref().map(str::to_string).unwrap_or_else(|| schedule.id.to_string())
        );
    }
    Ok(())
}

async fn show_schedule(
    repo: &impl Repository,
    tenant_id: Uuid,
    zone: TenantZone,
    key: &str,
    preview: usize,
) -> Result<()> {
    let schedule = resolve_schedule(repo, tenant_id, key).await?;
    let rules = repo.find_rules_for_schedule(tenant_id, schedule.id).await?;

    println!("{} {}", "Schedule".bold(), schedule.id);
    if let Some(slug) = &schedule.slug {
        println!("  Slug:     {}", slug);
    }
    println!("  Section:  {}", schedule.section_id);
    println!("  Valid:    {}", schedule.date_range());
    println!("  Status:   {}{}", schedule.status, if schedule.is_active { "" } else { " (inactive)" });
    println!("  Timezone: {}", zone.name());
    println!();
    display_rules(&rules);

    if rules.iter().any(uses_parity) {
        println!(
            "{}",
            "Odd/even weeks count from Monday 1970-01-05, not from the schedule start.".bright_black()
        );
    }

    if preview > 0 && schedule.is_materializable() {
        let from = zone.today().max(schedule.start_date);
        if from <= schedule.end_date {
            let expander = RecurrenceExpander::new(&schedule, rules, zone)?;
            let firings = expander.preview(from, preview)?;
            println!();
            println!("{}", "Upcoming:".bold());
            display_preview(&firings, &zone);
        }
    }

    Ok(())
}

async fn edit_schedule(
    repo: &impl Repository,
    tenant_id: Uuid,
    zone: &TenantZone,
    command: EditScheduleCommand,
) -> Result<()> {
    let schedule = resolve_schedule(repo, tenant_id, &command.schedule).await?;

    let data = UpdateScheduleData {
        slug: patch_from(command.slug, command.slug_clear),
        start_date: command.from.as_deref().map(|d| parse_date(d, zone)).transpose()?,
        end_date: command.to.as_deref().map(|d| parse_date(d, zone)).transpose()?,
        status: command.status,
        is_active: command.active,
    };

    if data.slug.is_unset()
        && data.start_date.is_none()
        && data.end_date.is_none()
        && data.status.is_none()
        && data.is_active.is_none()
    {
        return Err(anyhow!("Nothing to change; pass at least one field to edit"));
    }

    let updated = repo.update_schedule(tenant_id, schedule.id, data).await?;
    println!(
        "{} Updated schedule {} (ID: {})",
        "✓".green().bold(),
        updated.slug.as_deref().unwrap_or("(no slug)"),
        updated.id
    );
    Ok(())
}
