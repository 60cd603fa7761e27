use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/services", post(handlers::services::create_service))
        .route("/api/services/:id", get(handlers::services::get_service))
        .route(
            "/api/services/:id/settings",
            put(handlers::services::update_settings),
        )
        .route(
            "/api/services/:id/schedule",
            get(handlers::schedule::get_schedule),
        )
        .route(
            "/api/services/:id/schedule/weekly",
            put(handlers::schedule::upsert_weekly),
        )
        .route(
            "/api/services/:id/schedule/special-dates",
            post(handlers::schedule::add_special_date),
        )
        .route(
            "/api/services/:id/schedule/special-dates/:override_id",
            delete(handlers::schedule::remove_special_date),
        )
        .route(
            "/api/services/:id/availability",
            get(handlers::availability::get_availability),
        )
        .route("/api/bookings", post(handlers::bookings::submit_booking))
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id/status",
            post(handlers::bookings::change_status),
        )
        .route(
            "/api/providers/:id/bookings",
            get(handlers::bookings::list_provider_bookings),
        )
        .route("/api/events", get(handlers::events::events_stream))
        .route(
            "/calendar/:booking_id",
            get(handlers::calendar::download_ics),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
