#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use jadwal_core::db::establish_connection;
use jadwal_core::models::{MaterializationConfig, NewRuleData, NewScheduleData, Schedule, Tenant};
use jadwal_core::repository::{ScheduleRepository, SqliteRepository, TenantRepository};
use tempfile::TempDir;
use uuid::Uuid;

/// Creates a repository over a fresh database in a temporary directory.
pub async fn setup_test_db() -> (SqliteRepository, TempDir) {
    setup_test_db_with(MaterializationConfig::default()).await
}

pub async fn setup_test_db_with(config: MaterializationConfig) -> (SqliteRepository, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish test database connection");

    (SqliteRepository::new(pool, config), temp_dir)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub async fn create_test_tenant(repo: &SqliteRepository) -> Tenant {
    repo.add_tenant("Masjid Al-Ikhlas".to_string(), Some("Asia/Jakarta".to_string()))
        .await
        .expect("Failed to create test tenant")
}

pub fn weekly_rule(day_of_week: u8) -> NewRuleData {
    NewRuleData {
        day_of_week,
        start_time: time(8, 0),
        end_time: time(9, 0),
        ..Default::default()
    }
}

pub fn schedule_data(tenant_id: Uuid, rules: Vec<NewRuleData>) -> NewScheduleData {
    NewScheduleData {
        tenant_id,
        section_id: Uuid::now_v7(),
        slug: None,
        start_date: date(2025, 1, 1),
        end_date: date(2025, 3, 31),
        status: None,
        rules,
    }
}

/// A Q1 2025 schedule with one rule every Monday 08:00-09:00.
pub async fn create_monday_schedule(repo: &SqliteRepository, tenant_id: Uuid) -> Schedule {
    repo.create_schedule(schedule_data(tenant_id, vec![weekly_rule(1)]))
        .await
        .expect("Failed to create test schedule")
}
