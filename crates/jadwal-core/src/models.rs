use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::error::CoreError;
use crate::patch::Patch;

/// A masjid or school. Every other record is scoped to one tenant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    /// IANA timezone name; the configured fallback offset applies when absent
    pub timezone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Scheduled,
    Ongoing,
    Completed,
    Canceled,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid schedule status: {0}")]
pub struct ParseScheduleStatusError(String);

impl FromStr for ScheduleStatus {
    type Err = ParseScheduleStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(ScheduleStatus::Scheduled),
            "ongoing" => Ok(ScheduleStatus::Ongoing),
            "completed" => Ok(ScheduleStatus::Completed),
            "canceled" | "cancelled" => Ok(ScheduleStatus::Canceled),
            _ => Err(ParseScheduleStatusError(s.to_string())),
        }
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleStatus::Scheduled => write!(f, "scheduled"),
            ScheduleStatus::Ongoing => write!(f, "ongoing"),
            ScheduleStatus::Completed => write!(f, "completed"),
            ScheduleStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Recurring weekly class-time definition valid over an inclusive date range.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Schedule {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// The class section whose sessions this schedule drives
    pub section_id: Uuid,
    pub slug: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ScheduleStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Schedule {
    pub fn date_range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    /// Whether new sessions may be generated from this schedule.
    pub fn is_materializable(&self) -> bool {
        self.is_active
            && self.deleted_at.is_none()
            && matches!(self.status, ScheduleStatus::Scheduled | ScheduleStatus::Ongoing)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WeekParity {
    #[default]
    All,
    Odd,
    Even,
}

impl WeekParity {
    /// Checks an absolute week index (weeks since the epoch anchor Monday).
    pub fn matches(&self, absolute_week: i64) -> bool {
        match self {
            WeekParity::All => true,
            WeekParity::Odd => absolute_week.rem_euclid(2) == 1,
            WeekParity::Even => absolute_week.rem_euclid(2) == 0,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid week parity: {0}")]
pub struct ParseWeekParityError(String);

impl FromStr for WeekParity {
    type Err = ParseWeekParityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(WeekParity::All),
            "odd" => Ok(WeekParity::Odd),
            "even" => Ok(WeekParity::Even),
            _ => Err(ParseWeekParityError(s.to_string())),
        }
    }
}

impl std::fmt::Display for WeekParity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeekParity::All => write!(f, "all"),
            WeekParity::Odd => write!(f, "odd"),
            WeekParity::Even => write!(f, "even"),
        }
    }
}

/// One weekly recurrence pattern belonging to a [`Schedule`].
///
/// `weeks_of_month` and `last_week_of_month` are month-based selectors. When
/// either is set they replace `interval_weeks`, `start_offset_weeks` and
/// `week_parity` for week selection, and the two union with each other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleRule {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub schedule_id: Uuid,
    /// ISO day of week, Monday = 1 through Sunday = 7
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub interval_weeks: u32,
    pub start_offset_weeks: u32,
    pub week_parity: WeekParity,
    pub weeks_of_month: Vec<u8>,
    pub last_week_of_month: bool,
    pub room_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ScheduleRule {
    pub fn weekday(&self) -> Option<Weekday> {
        weekday_from_iso(self.day_of_week)
    }

    pub fn is_month_based(&self) -> bool {
        !self.weeks_of_month.is_empty() || self.last_week_of_month
    }
}

/// Maps an ISO day number (Monday = 1) to a [`Weekday`].
pub fn weekday_from_iso(day: u8) -> Option<Weekday> {
    match day {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

/// Storage shape of a rule row; `weeks_of_month` is kept as a JSON array.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ScheduleRuleRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub schedule_id: Uuid,
    pub day_of_week: i64,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub interval_weeks: i64,
    pub start_offset_weeks: i64,
    pub week_parity: WeekParity,
    pub weeks_of_month: Option<String>,
    pub last_week_of_month: bool,
    pub room_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ScheduleRuleRow> for ScheduleRule {
    type Error = CoreError;

    fn try_from(row: ScheduleRuleRow) -> Result<Self, Self::Error> {
        let weeks_of_month = match row.weeks_of_month.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw).map_err(|e| {
                CoreError::InvalidInput(format!(
                    "Rule {} has malformed weeks_of_month '{}': {}",
                    row.id, raw, e
                ))
            })?,
            _ => Vec::new(),
        };

        let narrow = |name: &str, value: i64| {
            u32::try_from(value).map_err(|_| {
                CoreError::InvalidInput(format!("Rule {} has out-of-range {}: {}", row.id, name, value))
            })
        };

        Ok(Self {
            id: row.id,
            tenant_id: row.tenant_id,
            schedule_id: row.schedule_id,
            day_of_week: u8::try_from(row.day_of_week).map_err(|_| {
                CoreError::InvalidInput(format!(
                    "Rule {} has out-of-range day_of_week: {}",
                    row.id, row.day_of_week
                ))
            })?,
            start_time: row.start_time,
            end_time: row.end_time,
            interval_weeks: narrow("interval_weeks", row.interval_weeks)?,
            start_offset_weeks: narrow("start_offset_weeks", row.start_offset_weeks)?,
            week_parity: row.week_parity,
            weeks_of_month,
            last_week_of_month: row.last_week_of_month,
            room_id: row.room_id,
            teacher_id: row.teacher_id,
            notes: row.notes,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

/// Serializes month-week ordinals for storage; an empty set is stored as NULL.
pub(crate) fn encode_weeks_of_month(weeks: &[u8]) -> Result<Option<String>, CoreError> {
    if weeks.is_empty() {
        return Ok(None);
    }
    let mut sorted = weeks.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    serde_json::to_string(&sorted)
        .map(Some)
        .map_err(|e| CoreError::InvalidInput(format!("Cannot encode weeks_of_month: {}", e)))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Ongoing,
    Completed,
    Canceled,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid session status: {0}")]
pub struct ParseSessionStatusError(String);

impl FromStr for SessionStatus {
    type Err = ParseSessionStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(SessionStatus::Scheduled),
            "ongoing" => Ok(SessionStatus::Ongoing),
            "completed" => Ok(SessionStatus::Completed),
            "canceled" | "cancelled" => Ok(SessionStatus::Canceled),
            _ => Err(ParseSessionStatusError(s.to_string())),
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Scheduled => write!(f, "scheduled"),
            SessionStatus::Ongoing => write!(f, "ongoing"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Attendance lifecycle of a session. Owned by the attendance workflow; the
/// materializer only ever writes the initial `Open`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttendanceState {
    #[default]
    Open,
    Closed,
    Locked,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid attendance state: {0}")]
pub struct ParseAttendanceStateError(String);

impl FromStr for AttendanceState {
    type Err = ParseAttendanceStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(AttendanceState::Open),
            "closed" => Ok(AttendanceState::Closed),
            "locked" => Ok(AttendanceState::Locked),
            _ => Err(ParseAttendanceStateError(s.to_string())),
        }
    }
}

impl std::fmt::Display for AttendanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceState::Open => write!(f, "open"),
            AttendanceState::Closed => write!(f, "closed"),
            AttendanceState::Locked => write!(f, "locked"),
        }
    }
}

/// A materialized occurrence of a schedule on one calendar date.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ClassSession {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Back-reference to the generating schedule; kept after the schedule is deleted
    pub schedule_id: Option<Uuid>,
    pub rule_id: Option<Uuid>,
    pub section_id: Uuid,
    pub session_date: NaiveDate,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub attendance_state: AttendanceState,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if end < start {
            return Err(CoreError::InvalidInput(format!(
                "End date {} is before start date {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(DateRange { start, end })
    }

    /// Rejects ranges longer than `max_days`.
    pub fn ensure_at_most(&self, max_days: i64) -> Result<(), CoreError> {
        let days = self.days();
        if days > max_days {
            return Err(CoreError::WindowTooWide { days, max: max_days });
        }
        Ok(())
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ============================================================================
// Data Transfer Objects (DTOs)
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRuleData {
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Defaults to 1
    pub interval_weeks: Option<u32>,
    /// Defaults to 0
    pub start_offset_weeks: Option<u32>,
    pub week_parity: Option<WeekParity>,
    #[serde(default)]
    pub weeks_of_month: Vec<u8>,
    #[serde(default)]
    pub last_week_of_month: bool,
    pub room_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Patchable rule fields. Day and times are not patchable: replace the rule
/// instead, so already-materialized sessions keep matching their rule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRuleData {
    pub interval_weeks: Option<u32>,
    pub start_offset_weeks: Option<u32>,
    pub week_parity: Option<WeekParity>,
    #[serde(default)]
    pub weeks_of_month: Patch<Vec<u8>>,
    pub last_week_of_month: Option<bool>,
    #[serde(default)]
    pub room_id: Patch<Uuid>,
    #[serde(default)]
    pub teacher_id: Patch<Uuid>,
    #[serde(default)]
    pub notes: Patch<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewScheduleData {
    pub tenant_id: Uuid,
    pub section_id: Uuid,
    /// Normalized with [`crate::slug::generate_slug`]
    pub slug: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Option<ScheduleStatus>,
    #[serde(default)]
    pub rules: Vec<NewRuleData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateScheduleData {
    #[serde(default)]
    pub slug: Patch<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ScheduleStatus>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSessionData {
    pub status: Option<SessionStatus>,
    pub attendance_state: Option<AttendanceState>,
    #[serde(default)]
    pub notes: Patch<String>,
}

/// Narrows calendar and session listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct OccurrenceFilter {
    pub schedule_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
}

/// One calendar entry produced by the projector. Nothing about it is persisted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectedOccurrence {
    pub date: NaiveDate,
    pub schedule: Schedule,
    pub rule_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Statistics collected during tenant-wide materialization
#[derive(Debug, Clone, Default)]
pub struct MaterializationSummary {
    /// Number of schedules processed
    pub schedules_processed: usize,
    /// Total sessions created across all schedules
    pub sessions_created: usize,
    /// Number of schedules that stopped on an error
    pub schedules_with_errors: usize,
    /// Detailed error messages
    pub errors: Vec<String>,
    /// Time taken for the operation
    pub duration_ms: u64,
}

/// Limits and defaults for materialization and projection.
#[derive(Debug, Clone)]
pub struct MaterializationConfig {
    /// Widest calendar window accepted by the projector, in days
    pub max_window_days: i64,
    /// Widest range accepted by a single materialization call, in days
    pub max_range_days: i64,
    /// Offset used when a tenant's timezone is missing or cannot be loaded
    pub fallback_offset: FixedOffset,
}

impl Default for MaterializationConfig {
    fn default() -> Self {
        Self {
            max_window_days: 366,
            max_range_days: 366,
            fallback_offset: FixedOffset::east_opt(7 * 3600).unwrap_or_else(|| Utc.fix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let result = DateRange::new(date(2025, 2, 1), date(2025, 1, 1));
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn date_range_counts_inclusive_days() {
        let range = DateRange::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        assert_eq!(range.days(), 31);
        assert_eq!(DateRange::new(date(2025, 1, 1), date(2025, 1, 1)).unwrap().days(), 1);
    }

    #[test]
    fn date_range_intersection() {
        let a = DateRange::new(date(2025, 1, 1), date(2025, 3, 31)).unwrap();
        let b = DateRange::new(date(2024, 12, 1), date(2025, 1, 15)).unwrap();
        assert_eq!(a.intersect(&b), Some(DateRange::new(date(2025, 1, 1), date(2025, 1, 15)).unwrap()));

        let c = DateRange::new(date(2025, 4, 1), date(2025, 4, 2)).unwrap();
        assert_eq!(a.intersect(&c), None);
    }

    #[test]
    fn window_cap() {
        let range = DateRange::new(date(2025, 1, 1), date(2026, 1, 1)).unwrap();
        assert_eq!(range.days(), 366);
        assert!(range.ensure_at_most(366).is_ok());
        assert!(matches!(
            range.ensure_at_most(365),
            Err(CoreError::WindowTooWide { days: 366, max: 365 })
        ));
    }

    #[test]
    fn parity_uses_euclidean_remainder() {
        assert!(WeekParity::Even.matches(0));
        assert!(WeekParity::Odd.matches(-1));
        assert!(WeekParity::All.matches(7));
        assert!(!WeekParity::Odd.matches(2870));
    }

    #[test]
    fn status_parsing_accepts_british_spelling() {
        assert_eq!("Cancelled".parse::<ScheduleStatus>(), Ok(ScheduleStatus::Canceled));
        assert_eq!("ongoing".parse::<SessionStatus>(), Ok(SessionStatus::Ongoing));
        assert!("paused".parse::<ScheduleStatus>().is_err());
    }

    #[test]
    fn weeks_of_month_are_sorted_and_deduplicated() {
        assert_eq!(encode_weeks_of_month(&[3, 1, 3]).unwrap(), Some("[1,3]".to_string()));
        assert_eq!(encode_weeks_of_month(&[]).unwrap(), None);
    }
}
