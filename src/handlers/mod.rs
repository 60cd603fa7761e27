pub mod availability;
pub mod bookings;
pub mod calendar;
pub mod events;
pub mod health;
pub mod schedule;
pub mod services;

use axum::http::HeaderMap;

use crate::errors::AppError;

/// Provider-side routes carry `Authorization: Bearer <PROVIDER_TOKEN>`.
pub fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
