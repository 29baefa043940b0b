use anyhow::{anyhow, Result};
use dialoguer::Confirm;
use jadwal_core::error::CoreError;
use jadwal_core::models::{NewRuleData, UpdateRuleData};
use jadwal_core::repository::{Repository, RuleRepository};
use owo_colors::{OwoColorize, Style};
use uuid::Uuid;

use crate::cli::{EditRuleCommand, RuleAction, RuleArgs};
use crate::parser::{parse_day_of_week, parse_time, parse_uuid, parse_weeks};
use crate::util::{patch_from, resolve_schedule};
use crate::views::table::{day_name, describe_pattern};

pub async fn rule_command(repo: &impl Repository, tenant_id: Uuid, action: RuleAction) -> Result<()> {
    match action {
        RuleAction::Add { schedule, rule } => {
            let schedule = resolve_schedule(repo, tenant_id, &schedule).await?;
            let data = new_rule_data(rule)?;
            let rule = repo.add_rule(tenant_id, schedule.id, data).await?;

            let success_style = Style::new().green().bold();
            println!(
                "{} Added rule: {} {}-{} (ID: {})",
                "✓".style(success_style),
                day_name(rule.day_of_week).bold(),
                rule.start_time.format("%H:%M"),
                rule.end_time.format("%H:%M"),
                rule.id
            );
            println!("  {} {}", "→".blue(), describe_pattern(&rule));
            Ok(())
        }
        RuleAction::Edit(command) => edit_rule(repo, tenant_id, command).await,
        RuleAction::Delete { id, force } => {
            let id = parse_uuid(&id, "rule")?;
            let rule = repo
                .find_rule_by_id(tenant_id, id)
                .await?
                .ok_or_else(|| anyhow!(CoreError::NotFound(format!("Rule with id {} not found", id))))?;

            if !force {
                let confirmation = Confirm::new()
                    .with_prompt(format!(
                        "Are you sure you want to delete the {} {} rule?",
                        day_name(rule.day_of_week),
                        rule.start_time.format("%H:%M")
                    ))
                    .default(false)
                    .interact()
                    .unwrap_or(false);

                if !confirmation {
                    println!("Deletion cancelled.");
                    return Ok(());
                }
            }

            repo.delete_rule(tenant_id, id).await?;
            println!("{} Deleted rule {}", "✓".green().bold(), id);
            Ok(())
        }
    }
}

fn new_rule_data(args: RuleArgs) -> Result<NewRuleData> {
    Ok(NewRuleData {
        day_of_week: parse_day_of_week(&args.day)?,
        start_time: parse_time(&args.start)?,
        end_time: parse_time(&args.end)?,
        interval_weeks: args.every,
        start_offset_weeks: args.offset,
        week_parity: args.parity,
        weeks_of_month: args.weeks.as_deref().map(parse_weeks).transpose()?.unwrap_or_default(),
        last_week_of_month: args.last_week,
        room_id: args.room.as_deref().map(|r| parse_uuid(r, "room")).transpose()?,
        teacher_id: args.teacher.as_deref().map(|t| parse_uuid(t, "teacher")).transpose()?,
        notes: args.notes,
    })
}

async fn edit_rule(repo: &impl Repository, tenant_id: Uuid, command: EditRuleCommand) -> Result<()> {
    let id = parse_uuid(&command.id, "rule")?;

    let data = UpdateRuleData {
        interval_weeks: command.every,
        start_offset_weeks: command.offset,
        week_parity: command.parity,
        weeks_of_month: patch_from(
            command.weeks.as_deref().map(parse_weeks).transpose()?,
            command.weeks_clear,
        ),
        last_week_of_month: command.last_week,
        room_id: patch_from(
            command.room.as_deref().map(|r| parse_uuid(r, "room")).transpose()?,
            command.room_clear,
        ),
        teacher_id: patch_from(
            command.teacher.as_deref().map(|t| parse_uuid(t, "teacher")).transpose()?,
            command.teacher_clear,
        ),
        notes: patch_from(command.notes, command.notes_clear),
        is_active: command.active,
    };

    let rule = repo.update_rule(tenant_id, id, data).await?;
    println!(
        "{} Updated rule {} ({})",
        "✓".green().bold(),
        rule.id,
        describe_pattern(&rule)
    );
    println!(
        "  {} Sessions already created keep their dates; run `jadwal ensure` to fill new ones",
        "→".blue()
    );
    Ok(())
}
