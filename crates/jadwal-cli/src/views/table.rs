use chrono::{DateTime, NaiveTime, Utc};
use chrono_humanize::Humanize;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use jadwal_core::models::{
    AttendanceState, ClassSession, ProjectedOccurrence, Schedule, ScheduleRule, ScheduleStatus,
    SessionStatus, Tenant, WeekParity,
};
use jadwal_core::recurrence::RuleFiring;
use jadwal_core::timezone::{format_with_timezone, TenantZone};

const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

pub fn day_name(day_of_week: u8) -> &'static str {
    DAY_NAMES
        .get(usize::from(day_of_week.saturating_sub(1)))
        .copied()
        .unwrap_or("?")
}

fn time_span(start: NaiveTime, end: NaiveTime) -> String {
    format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"))
}

fn schedule_label(schedule: &Schedule) -> String {
    schedule
        .slug
        .clone()
        .unwrap_or_else(|| schedule.id.to_string()[..8].to_string())
}

/// Human summary of which weeks a rule fires in.
pub fn describe_pattern(rule: &ScheduleRule) -> String {
    if rule.is_month_based() {
        let mut parts: Vec<String> = Vec::new();
        if !rule.weeks_of_month.is_empty() {
            let weeks: Vec<String> = rule.weeks_of_month.iter().map(u8::to_string).collect();
            parts.push(format!("weeks {} of month", weeks.join(",")));
        }
        if rule.last_week_of_month {
            parts.push("last of month".to_string());
        }
        return parts.join(" + ");
    }

    let mut text = match rule.interval_weeks {
        1 => "weekly".to_string(),
        n => format!("every {} weeks", n),
    };
    if rule.start_offset_weeks > 0 {
        text.push_str(&format!(", skip {}", rule.start_offset_weeks));
    }
    if rule.week_parity != WeekParity::All {
        text.push_str(&format!(", {} weeks", rule.week_parity));
    }
    text
}

fn local_instant(instant: DateTime<Utc>, zone: &TenantZone) -> String {
    format_with_timezone(instant, zone, "%H:%M %:z")
}

pub fn display_tenants(tenants: &[Tenant]) {
    if tenants.is_empty() {
        println!("No tenants found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Timezone", "Created"]);

    for tenant in tenants {
        let mut row = Row::new();
        row.add_cell(Cell::new(tenant.id.to_string()));
        row.add_cell(Cell::new(&tenant.name));
        row.add_cell(match &tenant.timezone {
            Some(tz) => Cell::new(tz),
            None => Cell::new("fallback").fg(Color::DarkGrey),
        });
        row.add_cell(Cell::new(tenant.created_at.humanize()));
        table.add_row(row);
    }

    println!("{table}");
}

fn status_cell(status: ScheduleStatus, is_active: bool) -> Cell {
    let cell = Cell::new(if is_active {
        status.to_string()
    } else {
        format!("{} (inactive)", status)
    });
    match status {
        _ if !is_active => cell.fg(Color::DarkGrey),
        ScheduleStatus::Ongoing => cell.fg(Color::Green),
        ScheduleStatus::Completed => cell.fg(Color::DarkGrey),
        ScheduleStatus::Canceled => cell.fg(Color::DarkGrey).add_attribute(Attribute::CrossedOut),
        ScheduleStatus::Scheduled => cell,
    }
}

pub fn display_schedules(schedules: &[Schedule]) {
    if schedules.is_empty() {
        println!("No schedules found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Slug", "Section", "Valid", "Status", "Updated"]);

    for schedule in schedules {
        let mut row = Row::new();
        row.add_cell(Cell::new(schedule.id.to_string()));
        row.add_cell(Cell::new(schedule.slug.as_deref().unwrap_or("-")));
        row.add_cell(Cell::new(&schedule.section_id.to_string()[..8]));
        row.add_cell(Cell::new(schedule.date_range().to_string()));
        row.add_cell(status_cell(schedule.status, schedule.is_active));
        row.add_cell(Cell::new(schedule.updated_at.humanize()));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_rules(rules: &[ScheduleRule]) {
    if rules.is_empty() {
        println!("No rules. Add one with `jadwal rule add`.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Day", "Time", "Pattern", "Notes"]);

    for rule in rules {
        let mut row = Row::new();
        row.add_cell(Cell::new(rule.id.to_string()));
        row.add_cell(Cell::new(day_name(rule.day_of_week)).add_attribute(Attribute::Bold));
        row.add_cell(Cell::new(time_span(rule.start_time, rule.end_time)));
        let pattern = Cell::new(describe_pattern(rule));
        row.add_cell(if rule.is_active { pattern } else { pattern.fg(Color::DarkGrey) });
        row.add_cell(Cell::new(rule.notes.as_deref().unwrap_or("")));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_occurrences(occurrences: &[ProjectedOccurrence], zone: &TenantZone) {
    if occurrences.is_empty() {
        println!("No classes in this window.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Day", "Time", "Schedule", "Starts"]);

    let today = zone.today();
    for occurrence in occurrences {
        let mut row = Row::new();
        let date_cell = Cell::new(occurrence.date.to_string());
        row.add_cell(if occurrence.date == today {
            date_cell.fg(Color::Yellow).add_attribute(Attribute::Bold)
        } else if occurrence.date < today {
            date_cell.fg(Color::DarkGrey)
        } else {
            date_cell
        });
        row.add_cell(Cell::new(occurrence.date.format("%a").to_string()));
        row.add_cell(Cell::new(time_span(occurrence.start_time, occurrence.end_time)));
        row.add_cell(Cell::new(schedule_label(&occurrence.schedule)));
        row.add_cell(Cell::new(occurrence.starts_at.humanize()));
        table.add_row(row);
    }

    println!("{table}");
}

/// Upcoming dates shown under `schedule show`.
pub fn display_preview(firings: &[RuleFiring], zone: &TenantZone) {
    if firings.is_empty() {
        println!("No upcoming dates.");
        return;
    }

    for firing in firings {
        println!(
            "  {} {}  {} ({})",
            firing.date,
            firing.date.format("%a"),
            time_span(firing.start_time, firing.end_time),
            format_with_timezone(firing.starts_at, zone, "%:z")
        );
    }
}

pub fn display_sessions(sessions: &[ClassSession], zone: &TenantZone) {
    if sessions.is_empty() {
        println!("No sessions found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Time", "Status", "Attendance", "Notes"]);

    for session in sessions {
        let mut row = Row::new();
        row.add_cell(Cell::new(session.id.to_string()));
        row.add_cell(Cell::new(session.session_date.to_string()));
        row.add_cell(Cell::new(format!(
            "{}-{}",
            local_instant(session.starts_at, zone),
            format_with_timezone(session.ends_at, zone, "%H:%M")
        )));

        let status = Cell::new(session.status.to_string());
        row.add_cell(match session.status {
            SessionStatus::Canceled => status.fg(Color::DarkGrey).add_attribute(Attribute::CrossedOut),
            SessionStatus::Completed => status.fg(Color::Green),
            SessionStatus::Ongoing => status.fg(Color::Yellow),
            SessionStatus::Scheduled => status,
        });

        let attendance = Cell::new(session.attendance_state.to_string());
        row.add_cell(match session.attendance_state {
            AttendanceState::Open => attendance,
            AttendanceState::Closed => attendance.fg(Color::Blue),
            AttendanceState::Locked => attendance.fg(Color::Red),
        });
        row.add_cell(Cell::new(session.notes.as_deref().unwrap_or("")));
        table.add_row(row);
    }

    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn rule() -> ScheduleRule {
        ScheduleRule {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            schedule_id: Uuid::new_v4(),
            day_of_week: 5,
            start_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
            interval_weeks: 1,
            start_offset_weeks: 0,
            week_parity: WeekParity::All,
            weeks_of_month: vec![],
            last_week_of_month: false,
            room_id: None,
            teacher_id: None,
            notes: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_describe_pattern() {
        assert_eq!(describe_pattern(&rule()), "weekly");

        let fortnightly = ScheduleRule { interval_weeks: 2, start_offset_weeks: 1, ..rule() };
        assert_eq!(describe_pattern(&fortnightly), "every 2 weeks, skip 1");

        let odd = ScheduleRule { week_parity: WeekParity::Odd, ..rule() };
        assert_eq!(describe_pattern(&odd), "weekly, odd weeks");

        let monthly = ScheduleRule {
            weeks_of_month: vec![1, 3],
            last_week_of_month: true,
            week_parity: WeekParity::Even,
            ..rule()
        };
        assert_eq!(describe_pattern(&monthly), "weeks 1,3 of month + last of month");
    }

    #[test]
    fn test_day_name() {
        assert_eq!(day_name(1), "Mon");
        assert_eq!(day_name(7), "Sun");
        assert_eq!(day_name(0), "?");
    }
}
