use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::BookingPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub provider_id: String,
    pub name: String,
    /// Price of a single slot.
    pub price: Decimal,
    pub currency: String,
    pub timezone: String,
    pub policy: BookingPolicy,
    pub created_at: NaiveDateTime,
}
