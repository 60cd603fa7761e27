use serde::{Deserialize, Serialize};

/// Per-service booking settings, read-only while slots are computed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingPolicy {
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
    #[serde(default = "default_capacity")]
    pub max_concurrent_bookings: u32,
    #[serde(default = "default_advance_days")]
    pub advance_booking_days: u32,
    /// Stored with the policy; slot computation does not apply it.
    #[serde(default)]
    pub buffer_time_minutes: u32,
    #[serde(default = "default_cancellation_hours")]
    pub cancellation_policy_hours: u32,
    #[serde(default)]
    pub require_confirmation: bool,
    #[serde(default = "default_true")]
    pub allow_customer_cancellation: bool,
}

fn default_duration() -> u32 {
    60
}

fn default_capacity() -> u32 {
    1
}

fn default_advance_days() -> u32 {
    30
}

fn default_cancellation_hours() -> u32 {
    24
}

fn default_true() -> bool {
    true
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            duration_minutes: default_duration(),
            max_concurrent_bookings: default_capacity(),
            advance_booking_days: default_advance_days(),
            buffer_time_minutes: 0,
            cancellation_policy_hours: default_cancellation_hours(),
            require_confirmation: false,
            allow_customer_cancellation: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let policy: BookingPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, BookingPolicy::default());
        assert_eq!(policy.duration_minutes, 60);
        assert!(policy.allow_customer_cancellation);
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let policy: BookingPolicy =
            serde_json::from_str(r#"{"duration_minutes":30,"require_confirmation":true}"#).unwrap();
        assert_eq!(policy.duration_minutes, 30);
        assert!(policy.require_confirmation);
        assert_eq!(policy.max_concurrent_bookings, 1);
    }
}
