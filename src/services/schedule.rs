use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{BookingPolicy, Service, SpecialDateOverride, WeeklyAvailability};
use crate::services::timeutil;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScheduleError {
    #[error("day_of_week must be between 0 and 6, got {0}")]
    InvalidDay(u8),

    #[error("end time must be after start time")]
    EndBeforeStart,

    #[error("an open special date needs both a start and an end time")]
    MissingHours,

    #[error("slot duration must be greater than zero")]
    ZeroDuration,

    #[error("slot duration cannot exceed a day")]
    DurationTooLong,

    #[error("max concurrent bookings must be at least 1")]
    ZeroCapacity,

    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("price must not be negative")]
    NegativePrice,

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

pub fn validate_weekly(entry: &WeeklyAvailability) -> Result<(), ScheduleError> {
    if entry.day_of_week > 6 {
        return Err(ScheduleError::InvalidDay(entry.day_of_week));
    }
    if entry.is_available && entry.end_time <= entry.start_time {
        return Err(ScheduleError::EndBeforeStart);
    }
    Ok(())
}

pub fn validate_special_date(
    is_available: bool,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
) -> Result<(), ScheduleError> {
    match (is_available, start_time, end_time) {
        (true, Some(start), Some(end)) if end <= start => Err(ScheduleError::EndBeforeStart),
        (true, Some(_), Some(_)) => Ok(()),
        (true, _, _) => Err(ScheduleError::MissingHours),
        (false, Some(start), Some(end)) if end <= start => Err(ScheduleError::EndBeforeStart),
        (false, _, _) => Ok(()),
    }
}

pub fn validate_policy(policy: &BookingPolicy) -> Result<(), ScheduleError> {
    if policy.duration_minutes == 0 {
        return Err(ScheduleError::ZeroDuration);
    }
    if policy.duration_minutes >= 24 * 60 {
        return Err(ScheduleError::DurationTooLong);
    }
    if policy.max_concurrent_bookings == 0 {
        return Err(ScheduleError::ZeroCapacity);
    }
    Ok(())
}

pub fn validate_service(service: &Service) -> Result<(), ScheduleError> {
    if service.name.trim().is_empty() {
        return Err(ScheduleError::Empty("name"));
    }
    if service.provider_id.trim().is_empty() {
        return Err(ScheduleError::Empty("provider_id"));
    }
    if service.currency.trim().is_empty() {
        return Err(ScheduleError::Empty("currency"));
    }
    if service.price < Decimal::ZERO {
        return Err(ScheduleError::NegativePrice);
    }
    if !timeutil::is_valid_timezone(&service.timezone) {
        return Err(ScheduleError::UnknownTimezone(service.timezone.clone()));
    }
    validate_policy(&service.policy)
}

fn require_service(conn: &Connection, service_id: &str) -> Result<Service, AppError> {
    queries::get_service(conn, service_id)?
        .ok_or_else(|| AppError::NotFound(format!("service {service_id}")))
}

pub fn create_service(conn: &Connection, service: &Service) -> Result<(), AppError> {
    validate_service(service)?;
    queries::create_service(conn, service)?;
    tracing::info!(service_id = %service.id, provider_id = %service.provider_id, "service created");
    Ok(())
}

pub fn update_policy(conn: &Connection, service_id: &str, policy: &BookingPolicy) -> Result<(), AppError> {
    validate_policy(policy)?;
    if !queries::update_service_policy(conn, service_id, policy)? {
        return Err(AppError::NotFound(format!("service {service_id}")));
    }
    tracing::info!(service_id, duration = policy.duration_minutes, "booking settings updated");
    Ok(())
}

/// Creates or replaces the entry for `entry.day_of_week`.
pub fn upsert_weekly(conn: &Connection, entry: &WeeklyAvailability) -> Result<(), AppError> {
    validate_weekly(entry)?;
    require_service(conn, &entry.service_id)?;
    queries::upsert_weekly_availability(conn, entry)?;
    tracing::info!(
        service_id = %entry.service_id,
        day = entry.day_of_week,
        open = entry.is_available,
        "weekly availability saved"
    );
    Ok(())
}

/// Appends a new override; earlier overrides for the same date are kept.
pub fn add_special_date(
    conn: &Connection,
    service_id: &str,
    special_date: NaiveDate,
    is_available: bool,
    note: Option<String>,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
) -> Result<SpecialDateOverride, AppError> {
    validate_special_date(is_available, start_time, end_time)?;
    require_service(conn, service_id)?;

    let ov = SpecialDateOverride {
        id: uuid::Uuid::new_v4().to_string(),
        service_id: service_id.to_string(),
        special_date,
        is_available,
        note,
        start_time,
        end_time,
        created_at: queries::now_ts(),
    };
    queries::insert_special_date(conn, &ov)?;
    tracing::info!(service_id, date = %special_date, open = is_available, "special date added");
    Ok(ov)
}

pub fn remove_special_date(conn: &Connection, service_id: &str, override_id: &str) -> Result<(), AppError> {
    if !queries::delete_special_date(conn, service_id, override_id)? {
        return Err(AppError::NotFound(format!("special date {override_id}")));
    }
    Ok(())
}
