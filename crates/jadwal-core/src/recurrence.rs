use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc, Weekday};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{DateRange, NewRuleData, Schedule, ScheduleRule, WeekParity};
use crate::timezone::TenantZone;

/// Days from 0001-01-01 (CE day 1) to Monday 1970-01-05, the week-parity anchor.
const EPOCH_MONDAY_CE_DAYS: i32 = 719_167;

/// Largest month-week ordinal a weekday can have.
const MAX_WEEK_OF_MONTH: u8 = 5;

/// Checks a rule before it is stored.
///
/// # Behavior
/// - Day of week must be 1-7 (ISO, Monday = 1)
/// - End time must be strictly after start time; overnight rules are not supported
/// - Interval must be at least one week
/// - Month-week ordinals must be within 1-5
pub fn validate_rule(rule: &NewRuleData) -> Result<(), CoreError> {
    if !(1..=7).contains(&rule.day_of_week) {
        return Err(CoreError::InvalidInput(format!(
            "day_of_week must be between 1 and 7, got {}",
            rule.day_of_week
        )));
    }

    if rule.end_time <= rule.start_time {
        return Err(CoreError::InvalidInput(format!(
            "end_time {} must be after start_time {}",
            rule.end_time, rule.start_time
        )));
    }

    if rule.interval_weeks == Some(0) {
        return Err(CoreError::InvalidInput(
            "interval_weeks must be at least 1".to_string(),
        ));
    }

    validate_weeks_of_month(&rule.weeks_of_month)
}

pub fn validate_weeks_of_month(weeks: &[u8]) -> Result<(), CoreError> {
    match weeks.iter().find(|w| !(1..=MAX_WEEK_OF_MONTH).contains(*w)) {
        Some(bad) => Err(CoreError::InvalidInput(format!(
            "weeks_of_month entries must be between 1 and {}, got {}",
            MAX_WEEK_OF_MONTH, bad
        ))),
        None => Ok(()),
    }
}

/// Computes the dates on which `rule` fires inside both `schedule_range` and `window`.
///
/// # Behavior
/// - An empty intersection of the two ranges yields an empty result
/// - Walks one candidate date per ISO week: the rule's weekday in that week
/// - Month-based rules select weeks by the candidate's ordinal in its month
///   (`weeks_of_month`) or by it being the month's last such weekday
///   (`last_week_of_month`); the two selectors union
/// - Otherwise the week index is counted from the first matching weekday on or
///   after the schedule start, shifted by `start_offset_weeks`, stepped by
///   `interval_weeks`, and filtered by parity of the absolute week index
/// - Output is ascending; duplicates across rules are left to the caller
pub fn fire_dates(
    rule: &ScheduleRule,
    schedule_range: DateRange,
    window: DateRange,
) -> Result<Vec<NaiveDate>, CoreError> {
    let weekday = rule.weekday().ok_or_else(|| {
        CoreError::InvalidInput(format!(
            "Rule {} has invalid day_of_week {}",
            rule.id, rule.day_of_week
        ))
    })?;

    let Some(range) = schedule_range.intersect(&window) else {
        return Ok(Vec::new());
    };

    let Some(anchor) = first_on_or_after(schedule_range.start, weekday) else {
        return Ok(Vec::new());
    };
    let Some(first) = first_on_or_after(range.start, weekday) else {
        return Ok(Vec::new());
    };

    let interval = i64::from(rule.interval_weeks.max(1));
    let offset = i64::from(rule.start_offset_weeks);

    let dates = std::iter::successors(Some(first), |d| d.checked_add_days(Days::new(7)))
        .take_while(|d| *d <= range.end)
        .filter(|d| {
            if rule.is_month_based() {
                month_week_selected(rule, *d)
            } else {
                let week_index = (*d - anchor).num_days() / 7;
                week_index >= offset
                    && (week_index - offset) % interval == 0
                    && rule.week_parity.matches(absolute_week_index(*d))
            }
        })
        .collect();

    Ok(dates)
}

fn month_week_selected(rule: &ScheduleRule, date: NaiveDate) -> bool {
    let ordinal = week_of_month(date);
    rule.weeks_of_month.contains(&ordinal) || (rule.last_week_of_month && is_last_weekday_of_month(date))
}

/// 1-based position of `date` among the same weekdays of its month.
pub fn week_of_month(date: NaiveDate) -> u8 {
    // day0 is at most 30, so the ordinal is at most 5
    (date.day0() / 7 + 1) as u8
}

/// Whether no later date in the month shares `date`'s weekday.
pub fn is_last_weekday_of_month(date: NaiveDate) -> bool {
    date.checked_add_days(Days::new(7))
        .map_or(true, |next| next.month() != date.month())
}

/// Whole weeks between the epoch anchor Monday and the week containing `date`.
pub fn absolute_week_index(date: NaiveDate) -> i64 {
    let days = i64::from(date.num_days_from_ce() - EPOCH_MONDAY_CE_DAYS);
    days.div_euclid(7)
}

fn first_on_or_after(date: NaiveDate, weekday: Weekday) -> Option<NaiveDate> {
    let ahead = (7 + weekday.num_days_from_monday() - date.weekday().num_days_from_monday()) % 7;
    date.checked_add_days(Days::new(u64::from(ahead)))
}

/// Absolute start instant of a rule firing on `date` in the tenant's zone.
pub fn start_instant(date: NaiveDate, rule: &ScheduleRule, zone: &TenantZone) -> DateTime<Utc> {
    zone.to_utc(date, rule.start_time)
}

/// Absolute end instant of a rule firing on `date` in the tenant's zone.
pub fn end_instant(date: NaiveDate, rule: &ScheduleRule, zone: &TenantZone) -> DateTime<Utc> {
    zone.to_utc(date, rule.end_time)
}

/// One rule firing on one date, with its composed instants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFiring {
    pub date: NaiveDate,
    pub rule_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// RecurrenceExpander: expands one schedule's rules over a date window.
///
/// Holds the schedule's validity range, its active rules and the tenant zone,
/// and answers both the per-rule question (every firing, for calendars) and the
/// per-date question (one firing per date, for materialization).
#[derive(Debug)]
pub struct RecurrenceExpander {
    schedule_range: DateRange,
    rules: Vec<ScheduleRule>,
    zone: TenantZone,
}

impl RecurrenceExpander {
    /// Creates an expander for `schedule`.
    ///
    /// Rules that are inactive or soft-deleted are dropped. A rule with an
    /// invalid day of week makes construction fail.
    pub fn new(
        schedule: &Schedule,
        rules: Vec<ScheduleRule>,
        zone: TenantZone,
    ) -> Result<Self, CoreError> {
        let rules: Vec<ScheduleRule> = rules
            .into_iter()
            .filter(|r| r.is_active && r.deleted_at.is_none() && r.schedule_id == schedule.id)
            .collect();

        if let Some(bad) = rules.iter().find(|r| r.weekday().is_none()) {
            return Err(CoreError::InvalidInput(format!(
                "Rule {} has invalid day_of_week {}",
                bad.id, bad.day_of_week
            )));
        }

        Ok(Self {
            schedule_range: schedule.date_range(),
            rules,
            zone,
        })
    }

    pub fn rules(&self) -> &[ScheduleRule] {
        &self.rules
    }

    /// Every rule firing inside `window`, ordered by date then start time.
    pub fn firings_between(&self, window: DateRange) -> Result<Vec<RuleFiring>, CoreError> {
        let mut firings = Vec::new();
        for rule in &self.rules {
            for date in fire_dates(rule, self.schedule_range, window)? {
                firings.push(RuleFiring {
                    date,
                    rule_id: rule.id,
                    start_time: rule.start_time,
                    end_time: rule.end_time,
                    starts_at: start_instant(date, rule, &self.zone),
                    ends_at: end_instant(date, rule, &self.zone),
                });
            }
        }
        firings.sort_by(|a, b| {
            (a.date, a.start_time, a.rule_id).cmp(&(b.date, b.start_time, b.rule_id))
        });
        Ok(firings)
    }

    /// One firing per date inside `window`. When several rules fire on the
    /// same date the one with the earliest start time wins.
    pub fn daily_firings_between(&self, window: DateRange) -> Result<Vec<RuleFiring>, CoreError> {
        let mut by_date: BTreeMap<NaiveDate, RuleFiring> = BTreeMap::new();
        for firing in self.firings_between(window)? {
            by_date.entry(firing.date).or_insert(firing);
        }
        Ok(by_date.into_values().collect())
    }

    /// Preview the next `count` firing dates on or after `from`, looking at most one year ahead.
    pub fn preview(&self, from: NaiveDate, count: usize) -> Result<Vec<RuleFiring>, CoreError> {
        let end = from
            .checked_add_days(Days::new(365))
            .unwrap_or(self.schedule_range.end);
        let window = DateRange::new(from, end.max(from))?;
        let mut firings = self.daily_firings_between(window)?;
        firings.truncate(count);
        Ok(firings)
    }
}

/// Returns whether the parity setting would ever be consulted for `rule`.
pub fn uses_parity(rule: &ScheduleRule) -> bool {
    !rule.is_month_based() && rule.week_parity != WeekParity::All
}
