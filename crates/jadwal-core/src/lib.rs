//! # Jadwal Core Library
//!
//! Recurring class schedules for multi-tenant school and masjid backends, with
//! idempotent materialization of dated class sessions for attendance.
//!
//! ## Features
//!
//! - **Weekly Recurrence Rules**: Interval, start offset, odd/even week parity and
//!   month-week selectors (`weeks_of_month`, `last_week_of_month`)
//! - **Timezone Awareness**: Local class times are composed in each tenant's IANA
//!   zone, with a configurable fixed-offset fallback
//! - **Idempotent Materialization**: One session per schedule and date, safe to
//!   re-run and safe under concurrent callers
//! - **Calendar Projection**: Read-only occurrence listing for any window
//! - **Soft Delete**: Every read hides rows with `deleted_at` set
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Core data structures and transfer objects
//! - [`repository`]: Data access layer with Repository pattern
//! - [`recurrence`]: Rule validation and fire-date expansion
//! - [`timezone`]: Tenant zone resolution and local-to-UTC composition
//! - [`error`]: Error types shared by every module
//! - [`patch`]: Tri-state update fields
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chrono::{NaiveDate, NaiveTime};
//! use jadwal_core::{
//!     db,
//!     models::{MaterializationConfig, NewRuleData, NewScheduleData},
//!     repository::{MaterializationRepository, ScheduleRepository, SqliteRepository, TenantRepository},
//! };
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::establish_connection("jadwal.db").await?;
//!     let repo = SqliteRepository::new(pool, MaterializationConfig::default());
//!
//!     let tenant = repo.add_tenant("Masjid Al-Ikhlas".into(), Some("Asia/Jakarta".into())).await?;
//!     let schedule = repo
//!         .create_schedule(NewScheduleData {
//!             tenant_id: tenant.id,
//!             section_id: Uuid::now_v7(),
//!             slug: Some("tahsin-pagi".into()),
//!             start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
//!             end_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
//!             status: None,
//!             rules: vec![NewRuleData {
//!                 day_of_week: 1,
//!                 start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
//!                 end_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
//!                 ..Default::default()
//!             }],
//!         })
//!         .await?;
//!
//!     let created = repo
//!         .ensure_for_range(
//!             tenant.id,
//!             schedule.id,
//!             NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
//!             NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
//!         )
//!         .await?;
//!     println!("Created {} sessions", created);
//!
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod patch;
pub mod recurrence;
pub mod repository;
pub mod slug;
pub mod timezone;
