use serde::{Deserialize, Serialize};

/// Broadcast to SSE subscribers whenever a booking is written.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookingEvent {
    pub id: i64,
    pub booking_id: String,
    pub service_id: String,
    pub provider_id: String,
    pub kind: String,
    pub status: String,
    pub created_at: String,
}
