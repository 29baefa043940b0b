use anyhow::Result;
use owo_colors::{OwoColorize, Style};
use jadwal_core::repository::{Repository, TenantRepository};

use crate::cli::TenantAction;
use crate::config::Config;
use crate::parser::parse_uuid;
use crate::timezone::normalize_timezone_input;
use crate::views::table::display_tenants;

pub async fn tenant_command(repo: &impl Repository, action: TenantAction, config: &Config) -> Result<()> {
    let success_style = Style::new().green().bold();

    match action {
        TenantAction::Add { name, timezone } => {
            let timezone = match timezone {
                Some(tz) => normalize_timezone_input(&tz)?,
                None => normalize_timezone_input(&config.default_timezone)?,
            };
            let tenant = repo.add_tenant(name, Some(timezone)).await?;
            println!(
                "{} Added tenant: {} (ID: {})",
                "✓".style(success_style),
                tenant.name.bold(),
                tenant.id
            );
            if let Some(tz) = &tenant.timezone {
                println!("  {} Timezone: {}", "→".blue(), tz);
            }
        }
        TenantAction::List => {
            let tenants = repo.find_tenants().await?;
            display_tenants(&tenants);
        }
        TenantAction::SetTimezone { id, timezone, clear } => {
            let id = parse_uuid(&id, "tenant")?;
            let timezone = if clear {
                None
            } else {
                timezone.as_deref().map(normalize_timezone_input).transpose()?
            };
            let tenant = repo.set_tenant_timezone(id, timezone).await?;
            match &tenant.timezone {
                Some(tz) => println!("{} Timezone of '{}' set to {}", "✓".style(success_style), tenant.name, tz),
                None => println!(
                    "{} Timezone of '{}' cleared; the fallback offset {} applies",
                    "✓".style(success_style),
                    tenant.name,
                    config.fallback_offset
                ),
            }
        }
    }

    Ok(())
}
