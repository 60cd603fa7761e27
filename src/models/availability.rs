use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Recurring opening hours for one day of the week. `day_of_week` is 0 for Sunday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyAvailability {
    pub service_id: String,
    pub day_of_week: u8,
    #[serde(with = "crate::models::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::models::hhmm")]
    pub end_time: NaiveTime,
    pub is_available: bool,
}

/// A per-date exception to the weekly pattern: a closure, or an extra working
/// day when it carries its own hours.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecialDateOverride {
    pub id: String,
    pub service_id: String,
    pub special_date: NaiveDate,
    pub is_available: bool,
    pub note: Option<String>,
    #[serde(default, with = "crate::models::hhmm::option")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "crate::models::hhmm::option")]
    pub end_time: Option<NaiveTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleSource {
    Weekly,
    SpecialDate,
}

/// The schedule that governs a single date once overrides are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySchedule {
    pub source: ScheduleSource,
    pub is_available: bool,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub note: Option<String>,
}

impl DaySchedule {
    pub fn closed(source: ScheduleSource, note: Option<String>) -> Self {
        Self {
            source,
            is_available: false,
            start_time: NaiveTime::MIN,
            end_time: NaiveTime::MIN,
            note,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    #[serde(with = "crate::models::hhmm")]
    pub time: NaiveTime,
    pub available: bool,
    pub capacity: u32,
    pub booked: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyAvailability {
    pub date: NaiveDate,
    pub day_of_week: u8,
    pub is_available: bool,
    pub slots: Vec<TimeSlot>,
}

impl DailyAvailability {
    pub fn closed(date: NaiveDate, day_of_week: u8) -> Self {
        Self {
            date,
            day_of_week,
            is_available: false,
            slots: Vec::new(),
        }
    }
}

const DAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

pub fn day_name(day_of_week: u8) -> Option<&'static str> {
    DAY_NAMES.get(day_of_week as usize).copied()
}

/// Renders open weekly entries as `Mon: 09:00-17:00, Fri: 10:00-16:00`,
/// Sunday first.
pub fn weekly_summary(entries: &[WeeklyAvailability]) -> String {
    let mut open: Vec<&WeeklyAvailability> = entries.iter().filter(|e| e.is_available).collect();
    open.sort_by_key(|e| e.day_of_week);

    open.iter()
        .filter_map(|e| {
            let day = capitalize(day_name(e.day_of_week)?);
            Some(format!(
                "{day}: {}-{}",
                e.start_time.format("%H:%M"),
                e.end_time.format("%H:%M")
            ))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + c.as_str(),
    }
}
