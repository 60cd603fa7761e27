use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TimeError {
    #[error("invalid time (expected HH:MM): {0}")]
    InvalidTime(String),

    #[error("invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("{start} plus {minutes} minutes runs past midnight")]
    PastMidnight { start: String, minutes: u32 },
}

/// 0 = Sunday through 6 = Saturday.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn parse_date(s: &str) -> Result<NaiveDate, TimeError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| TimeError::InvalidDate(s.to_string()))
}

pub fn parse_time(s: &str) -> Result<NaiveTime, TimeError> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() != 2 || parts[1].len() != 2 {
        return Err(TimeError::InvalidTime(s.to_string()));
    }
    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| TimeError::InvalidTime(s.to_string()))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| TimeError::InvalidTime(s.to_string()))?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| TimeError::InvalidTime(s.to_string()))
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub fn minutes_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Adds whole minutes without wrapping; an end at or after midnight is an error.
pub fn add_minutes(start: NaiveTime, minutes: u32) -> Result<NaiveTime, TimeError> {
    let past_midnight = || TimeError::PastMidnight {
        start: format_time(start),
        minutes,
    };
    let total = minutes_of_day(start)
        .checked_add(minutes)
        .filter(|total| *total < 24 * 60)
        .ok_or_else(past_midnight)?;
    NaiveTime::from_hms_opt(total / 60, total % 60, 0).ok_or_else(past_midnight)
}

pub fn calculate_end_time(start_time: &str, duration_minutes: u32) -> Result<String, TimeError> {
    let start = parse_time(start_time)?;
    Ok(format_time(add_minutes(start, duration_minutes)?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Ar,
    Fr,
    De,
    Es,
}

impl Language {
    /// Accepts bare codes and region-tagged ones (`en-US`, `ar_SA`); unknown
    /// codes fall back to English.
    pub fn parse(code: &str) -> Self {
        let primary = code
            .split(['-', '_'])
            .next()
            .unwrap_or("")
            .to_lowercase();
        match primary.as_str() {
            "ar" => Language::Ar,
            "fr" => Language::Fr,
            "de" => Language::De,
            "es" => Language::Es,
            _ => Language::En,
        }
    }
}

pub fn format_time_display(time: &str, language: Language) -> Result<String, TimeError> {
    let t = parse_time(time)?;
    let (is_pm, hour12) = t.hour12();
    let display = match language {
        Language::En => {
            let suffix = if is_pm { "PM" } else { "AM" };
            format!("{hour12}:{:02} {suffix}", t.minute())
        }
        Language::Ar => {
            let suffix = if is_pm { "م" } else { "ص" };
            format!("{hour12}:{:02} {suffix}", t.minute())
        }
        Language::Fr => format!("{}h{:02}", t.hour(), t.minute()),
        Language::De | Language::Es => format_time(t),
    };
    Ok(display)
}

/// Unknown zone names fall back to UTC.
pub fn parse_timezone(name: &str) -> Tz {
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(timezone = name, "unknown timezone, falling back to UTC");
            chrono_tz::UTC
        }
    }
}

pub fn is_valid_timezone(name: &str) -> bool {
    name.parse::<Tz>().is_ok()
}

pub fn today_in(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// True when `date` falls between today and today + `advance_booking_days`
/// (inclusive), with "today" taken in the provider's timezone.
pub fn is_date_bookable(
    date: NaiveDate,
    advance_booking_days: u32,
    now: DateTime<Utc>,
    timezone: &str,
) -> bool {
    let today = today_in(now, parse_timezone(timezone));
    let last = today + Duration::days(advance_booking_days as i64);
    date >= today && date <= last
}

/// The instant a local date/time occurs in `tz`. Times skipped by a DST jump
/// resolve to the first valid instant after the gap.
pub fn local_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let local = date.and_time(time);
    match tz.from_local_datetime(&local).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            let shifted = local + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&local))
        }
    }
}
