use jadwal_core::error::CoreError;
use jadwal_core::timezone::validate_timezone;

/// Detect system timezone
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if !tz.is_empty() && validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    if let Ok(tz) = iana_time_zone::get_timezone() {
        if validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    "UTC".to_string()
}

/// Zones tenants are most often registered in.
pub fn get_common_timezones() -> Vec<&'static str> {
    vec![
        "Asia/Jakarta",
        "Asia/Pontianak",
        "Asia/Makassar",
        "Asia/Jayapura",
        "Asia/Kuala_Lumpur",
        "Asia/Singapore",
        "Asia/Brunei",
        "Asia/Bangkok",
        "Asia/Manila",
        "Asia/Riyadh",
        "Asia/Dubai",
        "Asia/Karachi",
        "Europe/London",
        "Europe/Istanbul",
        "Africa/Cairo",
        "UTC",
    ]
}

/// Suggest similar timezone for invalid input
pub fn suggest_timezone(invalid: &str) -> Vec<&'static str> {
    let invalid_lower = invalid.to_lowercase();

    let mut matches: Vec<_> = get_common_timezones()
        .into_iter()
        .filter(|tz| {
            let tz_lower = tz.to_lowercase();
            tz_lower.contains(&invalid_lower)
                || invalid_lower.contains(&tz_lower)
                || tz.split('/').any(|part| part.to_lowercase().contains(&invalid_lower))
        })
        .collect();

    matches.truncate(5);
    matches
}

/// Convert user-friendly timezone input to an IANA name.
///
/// Accepts IANA names directly plus the Indonesian zone abbreviations
/// (WIB, WITA, WIT) and a few common aliases.
pub fn normalize_timezone_input(input: &str) -> Result<String, CoreError> {
    let input = input.trim();
    if validate_timezone(input).is_ok() {
        return Ok(input.to_string());
    }

    let normalized = match input.to_lowercase().as_str() {
        "wib" | "jakarta" => "Asia/Jakarta",
        "wita" | "makassar" | "bali" => "Asia/Makassar",
        "wit" | "jayapura" => "Asia/Jayapura",
        "myt" | "kuala lumpur" => "Asia/Kuala_Lumpur",
        "sgt" | "singapore" => "Asia/Singapore",
        "gmt" | "utc" => "UTC",
        _ => {
            let suggestions = suggest_timezone(input);
            return Err(if suggestions.is_empty() {
                CoreError::InvalidTimezone(format!(
                    "Unknown timezone '{}'. Use IANA names like 'Asia/Jakarta'",
                    input
                ))
            } else {
                CoreError::InvalidTimezone(format!(
                    "Unknown timezone '{}'. Did you mean: {}?",
                    input,
                    suggestions.join(", ")
                ))
            });
        }
    };

    Ok(normalized.to_string())
}
