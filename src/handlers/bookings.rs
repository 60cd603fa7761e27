use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::check_auth;
use crate::models::{Booking, BookingStatus};
use crate::services::booking::{self, Actor, BookingRequest};
use crate::services::timeutil;
use crate::state::AppState;

// POST /api/bookings
#[derive(Deserialize)]
pub struct SubmitBookingRequest {
    pub service_id: String,
    pub customer_id: String,
    pub date: NaiveDate,
    /// Slot start times as `HH:MM`.
    pub selected_times: Vec<String>,
    pub notes: Option<String>,
    pub existing_booking_id: Option<String>,
}

pub async fn submit_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let times = body
        .selected_times
        .iter()
        .map(|t| timeutil::parse_time(t))
        .collect::<Result<Vec<_>, _>>()?;

    let req = BookingRequest {
        service_id: body.service_id,
        customer_id: body.customer_id,
        date: body.date,
        times,
        notes: body.notes.filter(|n| !n.trim().is_empty()),
        existing_booking_id: body.existing_booking_id,
    };

    let result = {
        let mut db = state.db()?;
        booking::submit_booking(&mut db, &req, Utc::now())
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) if e.is_internal() => {
            tracing::error!(error = %e, service_id = %req.service_id, date = %req.date, "booking write failed");
            return Err(AppError::BookingFailed);
        }
        Err(e) => return Err(e),
    };

    state.publish(outcome.event);
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.booking)))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let db = state.db()?;
    let booking = queries::get_booking_by_id(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    Ok(Json(booking))
}

// POST /api/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusChangeRequest {
    pub status: String,
    pub actor: Actor,
    pub customer_id: Option<String>,
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusChangeRequest>,
) -> Result<Json<Booking>, AppError> {
    if body.actor == Actor::Provider {
        check_auth(&headers, &state.config.provider_token)?;
    }

    let next = BookingStatus::parse(&body.status)
        .ok_or_else(|| AppError::Validation(format!("unknown booking status: {}", body.status)))?;

    let (booking, event) = {
        let db = state.db()?;
        booking::change_status(
            &db,
            &id,
            next,
            body.actor,
            body.customer_id.as_deref(),
            Utc::now(),
        )?
    };

    state.publish(event);
    Ok(Json(booking))
}

// GET /api/providers/:id/bookings
#[derive(Deserialize)]
pub struct ProviderBookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_provider_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(provider_id): Path<String>,
    Query(query): Query<ProviderBookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.provider_token)?;

    let status = match query.status.as_deref() {
        Some(s) => Some(
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown booking status: {s}")))?,
        ),
        None => None,
    };
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let db = state.db()?;
    let bookings = queries::get_provider_bookings(&db, &provider_id, status, limit)?;
    Ok(Json(bookings))
}
