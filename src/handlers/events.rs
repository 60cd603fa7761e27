use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::BookingEvent;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct EventsQuery {
    pub token: Option<String>,
    pub last_id: Option<i64>,
    pub provider_id: Option<String>,
}

fn to_sse(event: &BookingEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_default();
    Event::default()
        .id(event.id.to_string())
        .event("booking_event")
        .data(data)
}

// GET /api/events?token=...&last_id=...
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // EventSource cannot set headers, so the token rides in the query string
    if query.token.as_deref() != Some(state.config.provider_token.as_str()) {
        return Err(AppError::Unauthorized);
    }

    // Subscribe before the catch-up read so nothing falls between the two
    let rx = state.events_tx.subscribe();

    let last_id = query.last_id.unwrap_or(0);
    let catchup = {
        let db = state.db()?;
        queries::get_booking_events_since(&db, last_id)?
    };
    let newest_seen = catchup.last().map(|e| e.id).unwrap_or(last_id);

    let provider = query.provider_id.clone();
    let wanted = move |event: &BookingEvent| {
        provider.as_deref().map_or(true, |p| p == event.provider_id)
    };
    let wanted_live = wanted.clone();

    let catchup_stream = tokio_stream::iter(
        catchup
            .into_iter()
            .filter(move |e| wanted(e))
            .map(|e| Ok::<_, Infallible>(to_sse(&e))),
    );

    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.id > newest_seen && wanted_live(&event) => Some(Ok(to_sse(&event))),
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "event subscriber lagged");
            None
        }
    });

    let keepalive_stream = IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
        .map(|_| Ok(Event::default().comment("keepalive")));

    let merged = catchup_stream.chain(live_stream).merge(keepalive_stream);
    Ok(Sse::new(merged))
}
