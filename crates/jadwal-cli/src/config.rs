use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use jadwal_core::models::MaterializationConfig;
use jadwal_core::timezone::parse_fixed_offset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::timezone::detect_system_timezone;

const CONFIG_FILE: &str = "jadwal.toml";

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// SQLite database file
    pub database_path: String,
    /// Tenant used when `--tenant` is not given
    pub default_tenant: Option<String>,
    /// Timezone assigned to new tenants that do not name one
    pub default_timezone: String,
    /// Offset used when a tenant's timezone is missing or unknown
    pub fallback_offset: String,
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub log_level: String,
    pub materialization: MaterializationSettings,
}

/// Limits applied to materialization and calendar requests
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MaterializationSettings {
    /// Widest calendar window, in days
    pub max_window_days: i64,
    /// Widest `ensure` range, in days
    pub max_range_days: i64,
}

impl Default for MaterializationSettings {
    fn default() -> Self {
        let core = MaterializationConfig::default();
        Self {
            max_window_days: core.max_window_days,
            max_range_days: core.max_range_days,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "jadwal.db".to_string(),
            default_tenant: None,
            default_timezone: detect_system_timezone(),
            fallback_offset: "+07:00".to_string(),
            log_level: "warn".to_string(),
            materialization: MaterializationSettings::default(),
        }
    }
}

impl Config {
    /// Loads defaults, then `jadwal.toml` (or the file named by `JADWAL_CONFIG`),
    /// then `JADWAL_`-prefixed environment variables. Nested keys use `__`, e.g.
    /// `JADWAL_MATERIALIZATION__MAX_RANGE_DAYS`.
    pub fn new() -> Result<Self, figment::Error> {
        let file = std::env::var_os("JADWAL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

        Self::figment(file).extract()
    }

    fn figment(file: PathBuf) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("JADWAL_").ignore(&["config"]).split("__"))
    }

    /// The core library's view of these settings.
    pub fn materialization_config(&self) -> Result<MaterializationConfig, jadwal_core::error::CoreError> {
        Ok(MaterializationConfig {
            max_window_days: self.materialization.max_window_days,
            max_range_days: self.materialization.max_range_days,
            fallback_offset: parse_fixed_offset(&self.fallback_offset)?,
        })
    }
}
