use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use chrono_english::{parse_date_string, Dialect};
use jadwal_core::timezone::TenantZone;
use uuid::Uuid;

/// Parses `YYYY-MM-DD`, falling back to natural language ("today", "next monday")
/// read against the tenant's wall clock.
pub fn parse_date(input: &str, zone: &TenantZone) -> Result<NaiveDate> {
    parse_date_at(input, zone.now_local())
}

fn parse_date_at(input: &str, now: DateTime<FixedOffset>) -> Result<NaiveDate> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_date_string(input, now, Dialect::Uk)
        .map(|dt| dt.date_naive())
        .map_err(|e| anyhow!("Failed to parse date '{}': {}", input, e))
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_time(input: &str) -> Result<NaiveTime> {
    let input = input.trim();
    NaiveTime::parse_from_str(input, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M:%S"))
        .map_err(|_| anyhow!("Invalid time '{}', expected HH:MM", input))
}

/// Parses a day name or ISO number into Monday = 1 .. Sunday = 7.
pub fn parse_day_of_week(input: &str) -> Result<u8> {
    let day = match input.trim().to_lowercase().as_str() {
        "1" | "mon" | "monday" | "senin" => 1,
        "2" | "tue" | "tuesday" | "selasa" => 2,
        "3" | "wed" | "wednesday" | "rabu" => 3,
        "4" | "thu" | "thursday" | "kamis" => 4,
        "5" | "fri" | "friday" | "jumat" => 5,
        "6" | "sat" | "saturday" | "sabtu" => 6,
        "7" | "sun" | "sunday" | "minggu" | "ahad" => 7,
        other => return Err(anyhow!("Unknown day of week '{}'", other)),
    };
    Ok(day)
}

/// Parses a comma-separated list of month-week ordinals such as `1,3`.
pub fn parse_weeks(input: &str) -> Result<Vec<u8>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u8>()
                .with_context(|| format!("Invalid week number '{}'", s))
        })
        .collect()
}

pub fn parse_uuid(input: &str, what: &str) -> Result<Uuid> {
    input
        .trim()
        .parse::<Uuid>()
        .with_context(|| format!("Invalid {} ID '{}'", what, input))
}
