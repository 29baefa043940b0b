use clap::Parser;
use jadwal_core::db;
use jadwal_core::error::CoreError;
use jadwal_core::repository::SqliteRepository;
use jadwal_core::timezone::TenantZone;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::EnvFilter;
use util::resolve_tenant;

mod cli;
mod commands;
mod config;
mod parser;
mod timezone;
mod util;
mod views;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let config = match config::Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Invalid configuration: {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, &config).await {
        handle_error(e);
        std::process::exit(1);
    }
}

async fn run(cli: cli::Cli, config: &config::Config) -> anyhow::Result<()> {
    let materialization = config.materialization_config()?;
    let fallback_offset = materialization.fallback_offset;
    let db_pool = db::establish_connection(&config.database_path).await?;
    let repository = SqliteRepository::new(db_pool, materialization);

    let command = match cli.command {
        cli::Commands::Tenant(command) => {
            return commands::tenant::tenant_command(&repository, command.action, config).await;
        }
        command => command,
    };

    let tenant = resolve_tenant(&repository, cli.tenant.as_deref(), config).await?;
    let zone = TenantZone::resolve(tenant.timezone.as_deref(), fallback_offset);
    tracing::debug!(tenant_id = %tenant.id, zone = %zone.name(), "resolved tenant");

    match command {
        cli::Commands::Schedule(command) => {
            commands::schedule::schedule_command(&repository, tenant.id, zone, command.action).await
        }
        cli::Commands::Rule(command) => {
            commands::rule::rule_command(&repository, tenant.id, command.action).await
        }
        cli::Commands::Ensure(command) => {
            commands::ensure::ensure_sessions(&repository, tenant.id, zone, command).await
        }
        cli::Commands::Calendar(command) => {
            commands::calendar::show_calendar(&repository, tenant.id, zone, command).await
        }
        cli::Commands::Session(command) => {
            commands::session::session_command(&repository, tenant.id, zone, command.action).await
        }
        cli::Commands::Tenant(_) => unreachable!("tenant commands return above"),
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidTimezone(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::WindowTooWide { days, max } => {
                eprintln!(
                    "{} The window spans {} days; at most {} are allowed. Narrow --from/--to.",
                    "Error:".style(error_style),
                    days,
                    max
                );
            }
            CoreError::Conflict(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s.yellow());
            }
            CoreError::MaterializationAborted { date, created, source } => {
                eprintln!(
                    "{} Stopped at {}: {}",
                    "Error:".style(error_style),
                    date.yellow(),
                    source
                );
                eprintln!("  {} session(s) for earlier dates were kept; re-run to resume.", created);
            }
            _ => eprintln!("{} {:#}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}
