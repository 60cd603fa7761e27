use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::DailyAvailability;
use crate::services::booking::load_daily_availability;
use crate::services::timeutil::{self, Language};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
    pub exclude_booking: Option<String>,
    pub lang: Option<String>,
}

#[derive(Serialize)]
pub struct SlotView {
    time: String,
    label: String,
    available: bool,
    capacity: u32,
    booked: u32,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    service_id: String,
    date: NaiveDate,
    day_of_week: u8,
    is_available: bool,
    slots: Vec<SlotView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'static str>,
}

// GET /api/services/:id/availability?date=YYYY-MM-DD
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let date = timeutil::parse_date(&query.date)?;
    let language = Language::parse(query.lang.as_deref().unwrap_or("en"));

    let (day, notice) = {
        let db = state.db()?;
        let service = queries::get_service(&db, &service_id)?
            .ok_or_else(|| AppError::NotFound(format!("service {service_id}")))?;

        if !timeutil::is_date_bookable(
            date,
            service.policy.advance_booking_days,
            Utc::now(),
            &service.timezone,
        ) {
            let closed = DailyAvailability::closed(date, timeutil::day_of_week(date));
            (closed, Some("date is outside the booking window"))
        } else {
            match load_daily_availability(&db, &service, date, query.exclude_booking.as_deref()) {
                Ok(day) => (day, None),
                Err(e) => {
                    tracing::error!(error = %e, service_id = %service_id, %date, "failed to load availability");
                    let closed = DailyAvailability::closed(date, timeutil::day_of_week(date));
                    (closed, Some("failed to load availability"))
                }
            }
        }
    };

    let mut slots = Vec::with_capacity(day.slots.len());
    for slot in &day.slots {
        let time = timeutil::format_time(slot.time);
        slots.push(SlotView {
            label: timeutil::format_time_display(&time, language)?,
            time,
            available: slot.available,
            capacity: slot.capacity,
            booked: slot.booked,
        });
    }

    Ok(Json(AvailabilityResponse {
        service_id,
        date: day.date,
        day_of_week: day.day_of_week,
        is_available: day.is_available,
        slots,
        notice,
    }))
}
