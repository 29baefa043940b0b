mod helpers;

use chrono::Datelike;
use helpers::*;
use jadwal_core::error::CoreError;
use jadwal_core::models::*;
use jadwal_core::repository::{
    MaterializationRepository, RuleRepository, ScheduleRepository, SessionRepository,
    SqliteRepository, TenantRepository,
};
use uuid::Uuid;

async fn sessions_between(
    repo: &SqliteRepository,
    tenant_id: Uuid,
    schedule_id: Uuid,
    from: chrono::NaiveDate,
    to: chrono::NaiveDate,
) -> Vec<ClassSession> {
    let filter = OccurrenceFilter {
        schedule_id: Some(schedule_id),
        section_id: None,
    };
    repo.find_sessions(tenant_id, &filter, from, to).await.unwrap()
}

#[tokio::test]
async fn test_mondays_in_january_are_materialized() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;
    let schedule = create_monday_schedule(&repo, tenant.id).await;

    let created = repo
        .ensure_for_range(tenant.id, schedule.id, date(2025, 1, 1), date(2025, 1, 31))
        .await
        .unwrap();
    assert_eq!(created, 4);

    let sessions = sessions_between(&repo, tenant.id, schedule.id, date(2025, 1, 1), date(2025, 1, 31)).await;
    let dates: Vec<_> = sessions.iter().map(|s| s.session_date).collect();
    assert_eq!(
        dates,
        vec![date(2025, 1, 6), date(2025, 1, 13), date(2025, 1, 20), date(2025, 1, 27)]
    );

    let first = &sessions[0];
    assert_eq!(first.status, SessionStatus::Scheduled);
    assert_eq!(first.attendance_state, AttendanceState::Open);
    assert_eq!(first.section_id, schedule.section_id);
    assert_eq!(first.starts_at.to_rfc3339(), "2025-01-06T01:00:00+00:00");
    assert_eq!(first.ends_at.to_rfc3339(), "2025-01-06T02:00:00+00:00");
}

#[tokio::test]
async fn test_ensure_is_idempotent() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;
    let schedule = create_monday_schedule(&repo, tenant.id).await;

    assert!(repo.ensure_for_date(tenant.id, schedule.id, date(2025, 1, 6)).await.unwrap());
    assert!(!repo.ensure_for_date(tenant.id, schedule.id, date(2025, 1, 6)).await.unwrap());

    let first = repo
        .ensure_for_range(tenant.id, schedule.id, date(2025, 1, 1), date(2025, 3, 31))
        .await
        .unwrap();
    let second = repo
        .ensure_for_range(tenant.id, schedule.id, date(2025, 1, 1), date(2025, 3, 31))
        .await
        .unwrap();
    assert_eq!(first, 12);
    assert_eq!(second, 0);
}

#[tokio::test]
async fn test_range_matches_union_of_single_dates() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;
    let by_range = create_monday_schedule(&repo, tenant.id).await;
    let by_date = create_monday_schedule(&repo, tenant.id).await;

    repo.ensure_for_range(tenant.id, by_range.id, date(2025, 2, 1), date(2025, 2, 28))
        .await
        .unwrap();

    let mut day = date(2025, 2, 1);
    while day <= date(2025, 2, 28) {
        repo.ensure_for_date(tenant.id, by_date.id, day).await.unwrap();
        day = day.succ_opt().unwrap();
    }

    let range_dates: Vec<_> = sessions_between(&repo, tenant.id, by_range.id, date(2025, 2, 1), date(2025, 2, 28))
        .await
        .iter()
        .map(|s| s.session_date)
        .collect();
    let single_dates: Vec<_> = sessions_between(&repo, tenant.id, by_date.id, date(2025, 2, 1), date(2025, 2, 28))
        .await
        .iter()
        .map(|s| s.session_date)
        .collect();
    assert_eq!(range_dates, single_dates);
    assert_eq!(range_dates.len(), 4);
}

#[tokio::test]
async fn test_rerun_does_not_touch_existing_sessions() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;
    let schedule = create_monday_schedule(&repo, tenant.id).await;

    repo.ensure_for_date(tenant.id, schedule.id, date(2025, 1, 6)).await.unwrap();
    let session = repo
        .find_session_for_date(tenant.id, schedule.id, date(2025, 1, 6))
        .await
        .unwrap()
        .unwrap();

    repo.update_session(
        tenant.id,
        session.id,
        UpdateSessionData {
            attendance_state: Some(AttendanceState::Locked),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    // Moving the rule's time must not rewrite the already-materialized row.
    let rule = repo.find_rules_for_schedule(tenant.id, schedule.id).await.unwrap()[0].clone();
    repo.delete_rule(tenant.id, rule.id).await.unwrap();
    repo.add_rule(
        tenant.id,
        schedule.id,
        jadwal_core::models::NewRuleData {
            start_time: time(10, 0),
            end_time: time(11, 0),
            ..weekly_rule(1)
        },
    )
    .await
    .unwrap();

    repo.ensure_for_range(tenant.id, schedule.id, date(2025, 1, 1), date(2025, 1, 31))
        .await
        .unwrap();

    let after = repo.find_session_by_id(tenant.id, session.id).await.unwrap().unwrap();
    assert_eq!(after.attendance_state, AttendanceState::Locked);
    assert_eq!(after.starts_at, session.starts_at);
    assert_eq!(after.rule_id, Some(rule.id));
}

#[tokio::test]
async fn test_orphaned_sessions_are_kept() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;
    let schedule = create_monday_schedule(&repo, tenant.id).await;

    repo.ensure_for_range(tenant.id, schedule.id, date(2025, 1, 1), date(2025, 1, 31))
        .await
        .unwrap();

    // Switch the schedule to Wednesdays; Monday rows no longer match any rule.
    let rule = repo.find_rules_for_schedule(tenant.id, schedule.id).await.unwrap()[0].clone();
    repo.delete_rule(tenant.id, rule.id).await.unwrap();
    repo.add_rule(tenant.id, schedule.id, weekly_rule(3)).await.unwrap();

    let created = repo
        .ensure_for_range(tenant.id, schedule.id, date(2025, 1, 1), date(2025, 1, 31))
        .await
        .unwrap();
    assert_eq!(created, 5);

    let sessions = sessions_between(&repo, tenant.id, schedule.id, date(2025, 1, 1), date(2025, 1, 31)).await;
    assert_eq!(sessions.len(), 9);
    assert_eq!(
        sessions.iter().filter(|s| s.session_date.weekday() == chrono::Weekday::Mon).count(),
        4
    );
}

#[tokio::test]
async fn test_fifth_week_only_fires_in_long_months() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;
    let schedule = repo
        .create_schedule(schedule_data(
            tenant.id,
            vec![NewRuleData {
                weeks_of_month: vec![5],
                ..weekly_rule(1)
            }],
        ))
        .await
        .unwrap();

    let created = repo
        .ensure_for_range(tenant.id, schedule.id, date(2025, 2, 1), date(2025, 2, 28))
        .await
        .unwrap();
    assert_eq!(created, 0);

    let created = repo
        .ensure_for_range(tenant.id, schedule.id, date(2025, 1, 1), date(2025, 3, 31))
        .await
        .unwrap();
    assert_eq!(created, 1);
    assert!(repo
        .find_session_for_date(tenant.id, schedule.id, date(2025, 3, 31))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_earliest_rule_wins_on_shared_date() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;
    let afternoon = NewRuleData {
        start_time: time(13, 0),
        end_time: time(14, 30),
        ..weekly_rule(1)
    };
    let schedule = repo
        .create_schedule(schedule_data(tenant.id, vec![afternoon, weekly_rule(1)]))
        .await
        .unwrap();

    assert!(repo.ensure_for_date(tenant.id, schedule.id, date(2025, 1, 6)).await.unwrap());

    let session = repo
        .find_session_for_date(tenant.id, schedule.id, date(2025, 1, 6))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.starts_at.to_rfc3339(), "2025-01-06T01:00:00+00:00");
}

#[tokio::test]
async fn test_concurrent_ensure_converges_to_one_row() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;
    let schedule = create_monday_schedule(&repo, tenant.id).await;

    let (a, b) = tokio::join!(
        repo.ensure_for_date(tenant.id, schedule.id, date(2025, 1, 6)),
        repo.ensure_for_date(tenant.id, schedule.id, date(2025, 1, 6)),
    );
    let created = [a.unwrap(), b.unwrap()];
    assert_eq!(created.iter().filter(|c| **c).count(), 1);

    let sessions = sessions_between(&repo, tenant.id, schedule.id, date(2025, 1, 6), date(2025, 1, 6)).await;
    assert_eq!(sessions.len(), 1);
}

#[tokio::test]
async fn test_storage_error_aborts_remaining_dates() {
    let (repo, temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;
    let schedule = create_monday_schedule(&repo, tenant.id).await;

    sqlx::query(
        r#"CREATE TRIGGER fail_on_jan_20 BEFORE INSERT ON class_sessions
        WHEN NEW.session_date = '2025-01-20'
        BEGIN SELECT RAISE(ABORT, 'disk on fire'); END"#,
    )
    .execute(&repo_pool(&temp_dir).await)
    .await
    .unwrap();

    let result = repo
        .ensure_for_range(tenant.id, schedule.id, date(2025, 1, 1), date(2025, 1, 31))
        .await;

    match result {
        Err(CoreError::MaterializationAborted { date: at, created, source }) => {
            assert_eq!(at, date(2025, 1, 20));
            assert_eq!(created, 2);
            assert!(matches!(*source, CoreError::Database(_)));
        }
        other => panic!("expected MaterializationAborted, got {:?}", other),
    }

    let dates: Vec<_> = sessions_between(&repo, tenant.id, schedule.id, date(2025, 1, 1), date(2025, 1, 31))
        .await
        .iter()
        .map(|s| s.session_date)
        .collect();
    assert_eq!(dates, vec![date(2025, 1, 6), date(2025, 1, 13)]);
}

/// Opens a second pool on the test database for schema tweaks.
async fn repo_pool(temp_dir: &tempfile::TempDir) -> sqlx::SqlitePool {
    let db_path = temp_dir.path().join("test.db");
    jadwal_core::db::establish_connection(&db_path.to_string_lossy())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_unknown_or_deleted_schedule_is_not_found() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;
    let schedule = create_monday_schedule(&repo, tenant.id).await;

    assert!(matches!(
        repo.ensure_for_date(tenant.id, Uuid::now_v7(), date(2025, 1, 6)).await,
        Err(CoreError::NotFound(_))
    ));

    repo.delete_schedule(tenant.id, schedule.id).await.unwrap();
    assert!(matches!(
        repo.ensure_for_date(tenant.id, schedule.id, date(2025, 1, 6)).await,
        Err(CoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_sessions_survive_schedule_delete() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;
    let schedule = create_monday_schedule(&repo, tenant.id).await;

    repo.ensure_for_range(tenant.id, schedule.id, date(2025, 1, 1), date(2025, 1, 31))
        .await
        .unwrap();
    repo.delete_schedule(tenant.id, schedule.id).await.unwrap();

    let sessions = sessions_between(&repo, tenant.id, schedule.id, date(2025, 1, 1), date(2025, 1, 31)).await;
    assert_eq!(sessions.len(), 4);
}

#[tokio::test]
async fn test_inactive_or_finished_schedules_produce_nothing() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;

    let inactive = create_monday_schedule(&repo, tenant.id).await;
    repo.update_schedule(
        tenant.id,
        inactive.id,
        UpdateScheduleData {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let canceled = create_monday_schedule(&repo, tenant.id).await;
    repo.update_schedule(
        tenant.id,
        canceled.id,
        UpdateScheduleData {
            status: Some(ScheduleStatus::Canceled),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    for id in [inactive.id, canceled.id] {
        let created = repo
            .ensure_for_range(tenant.id, id, date(2025, 1, 1), date(2025, 1, 31))
            .await
            .unwrap();
        assert_eq!(created, 0);
    }
}

#[tokio::test]
async fn test_range_validation() {
    let config = MaterializationConfig {
        max_range_days: 31,
        ..Default::default()
    };
    let (repo, _temp_dir) = setup_test_db_with(config).await;
    let tenant = create_test_tenant(&repo).await;
    let schedule = create_monday_schedule(&repo, tenant.id).await;

    assert!(matches!(
        repo.ensure_for_range(tenant.id, schedule.id, date(2025, 2, 1), date(2025, 1, 1)).await,
        Err(CoreError::InvalidInput(_))
    ));
    assert!(matches!(
        repo.ensure_for_range(tenant.id, schedule.id, date(2025, 1, 1), date(2025, 2, 1)).await,
        Err(CoreError::WindowTooWide { days: 32, max: 31 })
    ));
    assert_eq!(
        repo.ensure_for_range(tenant.id, schedule.id, date(2025, 1, 1), date(2025, 1, 31))
            .await
            .unwrap(),
        4
    );
}

#[tokio::test]
async fn test_range_outside_schedule_is_empty() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;
    let schedule = create_monday_schedule(&repo, tenant.id).await;

    let created = repo
        .ensure_for_range(tenant.id, schedule.id, date(2025, 6, 1), date(2025, 6, 30))
        .await
        .unwrap();
    assert_eq!(created, 0);
}

#[tokio::test]
async fn test_ensure_tenant_for_range() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;

    let monday = create_monday_schedule(&repo, tenant.id).await;
    repo.create_schedule(schedule_data(tenant.id, vec![weekly_rule(3)]))
        .await
        .unwrap();
    let canceled = create_monday_schedule(&repo, tenant.id).await;
    repo.update_schedule(
        tenant.id,
        canceled.id,
        UpdateScheduleData {
            status: Some(ScheduleStatus::Canceled),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let summary = repo
        .ensure_tenant_for_range(tenant.id, None, date(2025, 1, 1), date(2025, 1, 31))
        .await
        .unwrap();
    assert_eq!(summary.schedules_processed, 3);
    assert_eq!(summary.sessions_created, 4 + 5);
    assert_eq!(summary.schedules_with_errors, 0);
    assert!(summary.errors.is_empty());

    let again = repo
        .ensure_tenant_for_range(tenant.id, Some(monday.section_id), date(2025, 1, 1), date(2025, 1, 31))
        .await
        .unwrap();
    assert_eq!(again.schedules_processed, 1);
    assert_eq!(again.sessions_created, 0);
}

#[tokio::test]
async fn test_session_operations() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;
    let schedule = create_monday_schedule(&repo, tenant.id).await;
    repo.ensure_for_range(tenant.id, schedule.id, date(2025, 1, 1), date(2025, 1, 31))
        .await
        .unwrap();

    let session = repo
        .find_session_for_date(tenant.id, schedule.id, date(2025, 1, 13))
        .await
        .unwrap()
        .unwrap();

    let canceled = repo.cancel_session(tenant.id, session.id).await.unwrap();
    assert_eq!(canceled.status, SessionStatus::Canceled);

    let noted = repo
        .update_session(
            tenant.id,
            session.id,
            UpdateSessionData {
                notes: jadwal_core::patch::Patch::SetValue("Hujan deras".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(noted.notes.as_deref(), Some("Hujan deras"));
    assert_eq!(noted.status, SessionStatus::Canceled);

    repo.delete_session(tenant.id, session.id).await.unwrap();
    assert!(repo.find_session_by_id(tenant.id, session.id).await.unwrap().is_none());
    assert_eq!(
        sessions_between(&repo, tenant.id, schedule.id, date(2025, 1, 1), date(2025, 1, 31))
            .await
            .len(),
        3
    );
    assert!(matches!(
        repo.delete_session(tenant.id, session.id).await,
        Err(CoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_spring_forward_gap_east_of_utc_materializes() {
    let (repo, _temp_dir) = setup_test_db().await;
    let tenant = create_test_tenant(&repo).await;
    repo.set_tenant_timezone(tenant.id, Some("Europe/Berlin".to_string()))
        .await
        .unwrap();

    // 02:00-03:00 is skipped in Berlin on Sunday 2025-03-30.
    let schedule = repo
        .create_schedule(schedule_data(
            tenant.id,
            vec![NewRuleData {
                start_time: time(1, 30),
                end_time: time(2, 30),
                ..weekly_rule(7)
            }],
        ))
        .await
        .unwrap();

    let created = repo
        .ensure_for_range(tenant.id, schedule.id, date(2025, 3, 1), date(2025, 3, 31))
        .await
        .unwrap();
    assert_eq!(created, 5);

    let sessions = sessions_between(&repo, tenant.id, schedule.id, date(2025, 3, 30), date(2025, 3, 30)).await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].starts_at.to_rfc3339(), "2025-03-30T00:30:00+00:00");
    assert_eq!(sessions[0].ends_at.to_rfc3339(), "2025-03-30T01:30:00+00:00");
}
