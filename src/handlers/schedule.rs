use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::check_auth;
use crate::models::availability::weekly_summary;
use crate::models::{SpecialDateOverride, WeeklyAvailability};
use crate::services::schedule;
use crate::state::AppState;

// GET /api/services/:id/schedule
#[derive(Serialize)]
pub struct ScheduleResponse {
    service_id: String,
    summary: String,
    weekly: Vec<WeeklyAvailability>,
    special_dates: Vec<SpecialDateOverride>,
}

pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let db = state.db()?;
    if queries::get_service(&db, &service_id)?.is_none() {
        return Err(AppError::NotFound(format!("service {service_id}")));
    }

    let weekly = queries::get_weekly_availability(&db, &service_id)?;
    let special_dates = queries::get_special_dates(&db, &service_id, None)?;

    Ok(Json(ScheduleResponse {
        summary: weekly_summary(&weekly),
        service_id,
        weekly,
        special_dates,
    }))
}

// PUT /api/services/:id/schedule/weekly
#[derive(Deserialize)]
pub struct WeeklyEntryRequest {
    pub day_of_week: u8,
    #[serde(with = "crate::models::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::models::hhmm")]
    pub end_time: NaiveTime,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

pub async fn upsert_weekly(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(service_id): Path<String>,
    Json(body): Json<WeeklyEntryRequest>,
) -> Result<Json<WeeklyAvailability>, AppError> {
    check_auth(&headers, &state.config.provider_token)?;

    let entry = WeeklyAvailability {
        service_id,
        day_of_week: body.day_of_week,
        start_time: body.start_time,
        end_time: body.end_time,
        is_available: body.is_available,
    };

    let db = state.db()?;
    schedule::upsert_weekly(&db, &entry)?;
    Ok(Json(entry))
}

// POST /api/services/:id/schedule/special-dates
#[derive(Deserialize)]
pub struct SpecialDateRequest {
    pub special_date: NaiveDate,
    pub is_available: bool,
    pub note: Option<String>,
    #[serde(default, with = "crate::models::hhmm::option")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "crate::models::hhmm::option")]
    pub end_time: Option<NaiveTime>,
}

pub async fn add_special_date(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(service_id): Path<String>,
    Json(body): Json<SpecialDateRequest>,
) -> Result<(StatusCode, Json<SpecialDateOverride>), AppError> {
    check_auth(&headers, &state.config.provider_token)?;

    let db = state.db()?;
    let created = schedule::add_special_date(
        &db,
        &service_id,
        body.special_date,
        body.is_available,
        body.note,
        body.start_time,
        body.end_time,
    )?;
    Ok((StatusCode::CREATED, Json(created)))
}

// DELETE /api/services/:id/schedule/special-dates/:override_id
pub async fn remove_special_date(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((service_id, override_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.provider_token)?;

    let db = state.db()?;
    schedule::remove_special_date(&db, &service_id, &override_id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}
