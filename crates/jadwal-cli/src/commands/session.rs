use anyhow::Result;
use jadwal_core::models::UpdateSessionData;
use jadwal_core::repository::{Repository, SessionRepository};
use jadwal_core::timezone::TenantZone;
use owo_colors::OwoColorize;
use uuid::Uuid;

use crate::cli::SessionAction;
use crate::commands::calendar::occurrence_filter;
use crate::parser::{parse_date, parse_uuid};
use crate::views::table::display_sessions;

pub async fn session_command(
    repo: &impl Repository,
    tenant_id: Uuid,
    zone: TenantZone,
    action: SessionAction,
) -> Result<()> {
    match action {
        SessionAction::List { from, to, section, schedule } => {
            let from = parse_date(&from, &zone)?;
            let to = parse_date(&to, &zone)?;
            let filter = occurrence_filter(repo, tenant_id, schedule.as_deref(), section.as_deref()).await?;
            let sessions = repo.find_sessions(tenant_id, &filter, from, to).await?;
            display_sessions(&sessions, &zone);
        }
        SessionAction::Cancel { id } => {
            let id = parse_uuid(&id, "session")?;
            let session = repo.cancel_session(tenant_id, id).await?;
            println!(
                "{} Canceled session on {} (ID: {})",
                "✓".green().bold(),
                session.session_date,
                session.id
            );
        }
        SessionAction::Attendance { id, state } => {
            let id = parse_uuid(&id, "session")?;
            let data = UpdateSessionData {
                attendance_state: Some(state),
                ..Default::default()
            };
            let session = repo.update_session(tenant_id, id, data).await?;
            println!(
                "{} Attendance for {} is now {}",
                "✓".green().bold(),
                session.session_date,
                session.attendance_state
            );
        }
    }

    Ok(())
}
