use crate::error::CoreError;
use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};
use chrono_tz::Tz;
use std::str::FromStr;

/// Validate IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<(), CoreError> {
    Tz::from_str(timezone)
        .map(|_| ())
        .map_err(|_| CoreError::InvalidTimezone(timezone.to_string()))
}

/// Parse a fixed UTC offset such as `+07:00` or `-03:30`.
pub fn parse_fixed_offset(offset: &str) -> Result<FixedOffset, CoreError> {
    FixedOffset::from_str(offset.trim())
        .map_err(|_| CoreError::InvalidTimezone(format!("Invalid UTC offset: {}", offset)))
}

/// The zone a tenant's local schedule times are interpreted in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TenantZone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl TenantZone {
    /// Resolves a tenant's configured zone name, falling back to `fallback`
    /// when the name is absent or cannot be loaded.
    pub fn resolve(timezone: Option<&str>, fallback: FixedOffset) -> Self {
        match timezone.map(str::trim).filter(|tz| !tz.is_empty()) {
            Some(name) => match name.parse::<Tz>() {
                Ok(tz) => TenantZone::Named(tz),
                Err(_) => {
                    tracing::warn!(timezone = name, fallback = %fallback, "Unknown tenant timezone, using fallback offset");
                    TenantZone::Fixed(fallback)
                }
            },
            None => TenantZone::Fixed(fallback),
        }
    }

    /// Converts a local wall-clock date and time to an absolute instant.
    ///
    /// Ambiguous local times (DST fall-back) take the earliest mapping. Local
    /// times inside a DST gap are shifted forward by the length of the gap.
    pub fn to_utc(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let naive = date.and_time(time);
        match self {
            TenantZone::Named(tz) => compose_in_zone(tz, &naive),
            TenantZone::Fixed(offset) => compose_in_zone(offset, &naive),
        }
    }

    /// The calendar date an instant falls on in this zone.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            TenantZone::Named(tz) => instant.with_timezone(tz).date_naive(),
            TenantZone::Fixed(offset) => instant.with_timezone(offset).date_naive(),
        }
    }

    /// Today's date in this zone.
    pub fn today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }

    /// The current wall-clock time in this zone.
    pub fn now_local(&self) -> DateTime<FixedOffset> {
        let now = Utc::now();
        match self {
            TenantZone::Named(tz) => {
                let local = now.with_timezone(tz);
                local.with_timezone(&local.offset().fix())
            }
            TenantZone::Fixed(offset) => now.with_timezone(offset),
        }
    }

    pub fn name(&self) -> String {
        match self {
            TenantZone::Named(tz) => tz.name().to_string(),
            TenantZone::Fixed(offset) => offset.to_string(),
        }
    }
}

fn compose_in_zone<Z: TimeZone>(zone: &Z, naive: &NaiveDateTime) -> DateTime<Utc> {
    match zone.from_local_datetime(naive) {
        LocalResult::Single(local) | LocalResult::Ambiguous(local, _) => local.with_timezone(&Utc),
        LocalResult::None => {
            // Inside a spring-forward gap: apply the offset in force a day
            // earlier, before the transition, which lands the same distance past it.
            let day_before = *naive - Duration::days(1);
            let before = match zone.from_local_datetime(&day_before).earliest() {
                Some(local) => local.offset().fix(),
                None => zone.offset_from_utc_datetime(&day_before).fix(),
            };
            Utc.from_utc_datetime(&(*naive - before))
        }
    }
}

/// Format datetime with timezone-aware display
pub fn format_with_timezone(datetime: DateTime<Utc>, zone: &TenantZone, format: &str) -> String {
    match zone {
        TenantZone::Named(tz) => datetime.with_timezone(tz).format(format).to_string(),
        TenantZone::Fixed(offset) => datetime.with_timezone(offset).format(format).to_string(),
    }
}
