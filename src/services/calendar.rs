use crate::models::{Booking, BookingStatus};
use crate::services::timeutil;

/// Renders a single-event iCalendar document for a booking. Start and end are
/// converted from the provider's wall clock to UTC.
pub fn generate_ics(booking: &Booking, service_name: &str, timezone: &str) -> String {
    let tz = timeutil::parse_timezone(timezone);
    let dtstart = timeutil::local_instant(booking.booking_date, booking.start_time, tz)
        .format("%Y%m%dT%H%M%SZ")
        .to_string();
    let dtend = timeutil::local_instant(booking.booking_date, booking.end_time, tz)
        .format("%Y%m%dT%H%M%SZ")
        .to_string();
    let dtstamp = booking.updated_at.format("%Y%m%dT%H%M%SZ").to_string();
    let uid = format!("{}@servyard", booking.id);

    let status = match booking.status {
        BookingStatus::Pending => "TENTATIVE",
        BookingStatus::Cancelled | BookingStatus::Rejected => "CANCELLED",
        BookingStatus::Confirmed | BookingStatus::Completed => "CONFIRMED",
    };
    let description = booking
        .notes
        .as_deref()
        .map(escape_text)
        .unwrap_or_else(|| "No additional notes".to_string());
    let summary = escape_text(service_name);

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//ServYard//Bookings//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use rust_decimal::Decimal;

    fn booking(notes: Option<&str>, status: BookingStatus) -> Booking {
        let stamp = NaiveDateTime::parse_from_str("2025-03-10 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        Booking {
            id: "test-123".to_string(),
            service_id: "svc-1".to_string(),
            provider_id: "prov-1".to_string(),
            customer_id: "cust-1".to_string(),
            booking_date: timeutil::parse_date("2025-03-15").unwrap(),
            start_time: timeutil::parse_time("14:00").unwrap(),
            end_time: timeutil::parse_time("15:30").unwrap(),
            status,
            price: Decimal::new(4500, 2),
            currency: "USD".to_string(),
            notes: notes.map(str::to_string),
            created_at: stamp,
            updated_at: stamp,
        }
    }

    #[test]
    fn test_generate_ics() {
        let ics = generate_ics(&booking(Some("Bring ID, please"), BookingStatus::Confirmed), "Haircut", "UTC");
        assert!(ics.contains("BEGIN:VCALENDAR"));
        assert!(ics.contains("DTSTART:20250315T140000Z"));
        assert!(ics.contains("DTEND:20250315T153000Z"));
        assert!(ics.contains("SUMMARY:Haircut"));
        assert!(ics.contains("DESCRIPTION:Bring ID\\, please"));
        assert!(ics.contains("STATUS:CONFIRMED"));
        assert!(ics.contains("UID:test-123@servyard"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn test_generate_ics_converts_timezone() {
        let ics = generate_ics(&booking(None, BookingStatus::Pending), "Haircut", "America/New_York");
        // EDT is UTC-4 on 2025-03-15
        assert!(ics.contains("DTSTART:20250315T180000Z"));
        assert!(ics.contains("DESCRIPTION:No additional notes"));
        assert!(ics.contains("STATUS:TENTATIVE"));
    }
}
