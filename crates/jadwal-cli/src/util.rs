use anyhow::{anyhow, Result};
use jadwal_core::error::CoreError;
use jadwal_core::models::{Schedule, Tenant};
use jadwal_core::patch::Patch;
use jadwal_core::repository::{Repository, ScheduleRepository, TenantRepository};
use uuid::Uuid;

use crate::config::Config;
use crate::parser::parse_uuid;

/// Picks the tenant for this invocation: `--tenant`, then `default_tenant`
/// from config, then the only registered tenant.
pub async fn resolve_tenant(repo: &impl Repository, explicit: Option<&str>, config: &Config) -> Result<Tenant> {
    if let Some(raw) = explicit.or(config.default_tenant.as_deref()) {
        let id = parse_uuid(raw, "tenant")?;
        return repo
            .find_tenant_by_id(id)
            .await?
            .ok_or_else(|| anyhow!(CoreError::NotFound(format!("Tenant with id {} not found", id))));
    }

    let mut tenants = repo.find_tenants().await?;
    match tenants.len() {
        1 => Ok(tenants.remove(0)),
        0 => Err(anyhow!(CoreError::InvalidInput(
            "No tenants registered. Create one with `jadwal tenant add`.".to_string()
        ))),
        _ => Err(anyhow!(CoreError::InvalidInput(
            "Several tenants exist; pass --tenant or set default_tenant.".to_string()
        ))),
    }
}

/// Finds a schedule by UUID or slug.
pub async fn resolve_schedule(repo: &impl Repository, tenant_id: Uuid, key: &str) -> Result<Schedule> {
    let found = match key.parse::<Uuid>() {
        Ok(id) => repo.find_schedule_by_id(tenant_id, id).await?,
        Err(_) => repo.find_schedule_by_slug(tenant_id, key).await?,
    };

    found.ok_or_else(|| anyhow!(CoreError::NotFound(format!("No schedule found for '{}'", key))))
}

/// Folds a `--field` / `--field-clear` flag pair into a [`Patch`].
pub fn patch_from<T>(value: Option<T>, clear: bool) -> Patch<T> {
    match (value, clear) {
        (_, true) => Patch::SetNull,
        (Some(value), false) => Patch::SetValue(value),
        (None, false) => Patch::Unset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_from_flags() {
        assert_eq!(patch_from(Some(3), false), Patch::SetValue(3));
        assert_eq!(patch_from::<u8>(None, true), Patch::SetNull);
        assert_eq!(patch_from::<u8>(None, false), Patch::Unset);
    }
}
