use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::check_auth;
use crate::models::{BookingPolicy, Service};
use crate::services::schedule;
use crate::state::AppState;

// POST /api/services
#[derive(Deserialize)]
pub struct CreateServiceRequest {
    pub provider_id: String,
    pub name: String,
    pub price: Decimal,
    pub currency: Option<String>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub policy: BookingPolicy,
}

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    check_auth(&headers, &state.config.provider_token)?;

    let service = Service {
        id: uuid::Uuid::new_v4().to_string(),
        provider_id: body.provider_id,
        name: body.name,
        price: body.price,
        currency: body.currency.unwrap_or_else(|| "USD".to_string()),
        timezone: body
            .timezone
            .unwrap_or_else(|| state.config.default_timezone.clone()),
        policy: body.policy,
        created_at: queries::now_ts(),
    };

    {
        let db = state.db()?;
        schedule::create_service(&db, &service)?;
    }

    Ok((StatusCode::CREATED, Json(service)))
}

// GET /api/services/:id
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Service>, AppError> {
    let db = state.db()?;
    let service = queries::get_service(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("service {id}")))?;
    Ok(Json(service))
}

// PUT /api/services/:id/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(policy): Json<BookingPolicy>,
) -> Result<Json<BookingPolicy>, AppError> {
    check_auth(&headers, &state.config.provider_token)?;

    let db = state.db()?;
    schedule::update_policy(&db, &id, &policy)?;
    Ok(Json(policy))
}
