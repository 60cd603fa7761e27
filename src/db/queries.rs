use std::str::FromStr;

use anyhow::{anyhow, Context};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::models::{
    Booking, BookingEvent, BookingPolicy, BookingStatus, Service, SpecialDateOverride,
    WeeklyAvailability,
};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn fmt_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn fmt_time(time: &NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).with_context(|| format!("bad timestamp in store: {s}"))
}

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).with_context(|| format!("bad date in store: {s}"))
}

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FORMAT).with_context(|| format!("bad time in store: {s}"))
}

fn parse_price(s: &str) -> anyhow::Result<Decimal> {
    Decimal::from_str(s).with_context(|| format!("bad price in store: {s}"))
}

pub fn now_ts() -> NaiveDateTime {
    Utc::now().naive_utc()
}

// ── Services ──

pub fn create_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    let p = &service.policy;
    conn.execute(
        "INSERT INTO services (id, provider_id, name, price, currency, timezone,
            duration_minutes, max_concurrent_bookings, advance_booking_days, buffer_time_minutes,
            cancellation_policy_hours, require_confirmation, allow_customer_cancellation, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            service.id,
            service.provider_id,
            service.name,
            service.price.to_string(),
            service.currency,
            service.timezone,
            p.duration_minutes,
            p.max_concurrent_bookings,
            p.advance_booking_days,
            p.buffer_time_minutes,
            p.cancellation_policy_hours,
            p.require_confirmation,
            p.allow_customer_cancellation,
            fmt_ts(&service.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let row = conn
        .query_row(
            "SELECT id, provider_id, name, price, currency, timezone,
                duration_minutes, max_concurrent_bookings, advance_booking_days, buffer_time_minutes,
                cancellation_policy_hours, require_confirmation, allow_customer_cancellation, created_at
             FROM services WHERE id = ?1",
            params![id],
            |row| Ok(parse_service_row(row)),
        )
        .optional()?;

    row.transpose()
}

pub fn update_service_policy(
    conn: &Connection,
    id: &str,
    policy: &BookingPolicy,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET
            duration_minutes = ?1,
            max_concurrent_bookings = ?2,
            advance_booking_days = ?3,
            buffer_time_minutes = ?4,
            cancellation_policy_hours = ?5,
            require_confirmation = ?6,
            allow_customer_cancellation = ?7
         WHERE id = ?8",
        params![
            policy.duration_minutes,
            policy.max_concurrent_bookings,
            policy.advance_booking_days,
            policy.buffer_time_minutes,
            policy.cancellation_policy_hours,
            policy.require_confirmation,
            policy.allow_customer_cancellation,
            id,
        ],
    )?;
    Ok(count > 0)
}

fn parse_service_row(row: &rusqlite::Row) -> anyhow::Result<Service> {
    let price: String = row.get(3)?;
    let created_at: String = row.get(13)?;

    Ok(Service {
        id: row.get(0)?,
        provider_id: row.get(1)?,
        name: row.get(2)?,
        price: parse_price(&price)?,
        currency: row.get(4)?,
        timezone: row.get(5)?,
        policy: BookingPolicy {
            duration_minutes: row.get(6)?,
            max_concurrent_bookings: row.get(7)?,
            advance_booking_days: row.get(8)?,
            buffer_time_minutes: row.get(9)?,
            cancellation_policy_hours: row.get(10)?,
            require_confirmation: row.get(11)?,
            allow_customer_cancellation: row.get(12)?,
        },
        created_at: parse_ts(&created_at)?,
    })
}

// ── Weekly Availability ──

pub fn upsert_weekly_availability(
    conn: &Connection,
    entry: &WeeklyAvailability,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO service_availability (service_id, day_of_week, start_time, end_time, is_available)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(service_id, day_of_week) DO UPDATE SET
           start_time = excluded.start_time,
           end_time = excluded.end_time,
           is_available = excluded.is_available,
           updated_at = datetime('now')",
        params![
            entry.service_id,
            entry.day_of_week,
            fmt_time(&entry.start_time),
            fmt_time(&entry.end_time),
            entry.is_available,
        ],
    )?;
    Ok(())
}

pub fn get_weekly_availability(
    conn: &Connection,
    service_id: &str,
) -> anyhow::Result<Vec<WeeklyAvailability>> {
    let mut stmt = conn.prepare(
        "SELECT service_id, day_of_week, start_time, end_time, is_available
         FROM service_availability WHERE service_id = ?1 ORDER BY day_of_week ASC",
    )?;

    let rows = stmt.query_map(params![service_id], |row| {
        let start: String = row.get(2)?;
        let end: String = row.get(3)?;
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, u8>(1)?,
            start,
            end,
            row.get::<_, bool>(4)?,
        ))
    })?;

    let mut entries = vec![];
    for row in rows {
        let (service_id, day_of_week, start, end, is_available) = row?;
        entries.push(WeeklyAvailability {
            service_id,
            day_of_week,
            start_time: parse_time(&start)?,
            end_time: parse_time(&end)?,
            is_available,
        });
    }
    Ok(entries)
}

// ── Special Dates ──

pub fn insert_special_date(conn: &Connection, ov: &SpecialDateOverride) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO service_special_dates (id, service_id, special_date, is_available, note, start_time, end_time, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            ov.id,
            ov.service_id,
            fmt_date(&ov.special_date),
            ov.is_available,
            ov.note,
            ov.start_time.as_ref().map(fmt_time),
            ov.end_time.as_ref().map(fmt_time),
            fmt_ts(&ov.created_at),
        ],
    )?;
    Ok(())
}

/// All overrides of a service, or only those for `date` when given.
pub fn get_special_dates(
    conn: &Connection,
    service_id: &str,
    date: Option<&NaiveDate>,
) -> anyhow::Result<Vec<SpecialDateOverride>> {
    let date_filter = date.map(fmt_date);
    let mut stmt = conn.prepare(
        "SELECT id, service_id, special_date, is_available, note, start_time, end_time, created_at
         FROM service_special_dates
         WHERE service_id = ?1 AND (?2 IS NULL OR special_date = ?2)
         ORDER BY special_date ASC, created_at ASC, rowid ASC",
    )?;

    let rows = stmt.query_map(params![service_id, date_filter], |row| {
        Ok(parse_special_date_row(row))
    })?;

    let mut overrides = vec![];
    for row in rows {
        overrides.push(row??);
    }
    Ok(overrides)
}

pub fn delete_special_date(conn: &Connection, service_id: &str, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM service_special_dates WHERE service_id = ?1 AND id = ?2",
        params![service_id, id],
    )?;
    Ok(count > 0)
}

fn parse_special_date_row(row: &rusqlite::Row) -> anyhow::Result<SpecialDateOverride> {
    let special_date: String = row.get(2)?;
    let start: Option<String> = row.get(5)?;
    let end: Option<String> = row.get(6)?;
    let created_at: String = row.get(7)?;

    Ok(SpecialDateOverride {
        id: row.get(0)?,
        service_id: row.get(1)?,
        special_date: parse_date(&special_date)?,
        is_available: row.get(3)?,
        note: row.get(4)?,
        start_time: start.as_deref().map(parse_time).transpose()?,
        end_time: end.as_deref().map(parse_time).transpose()?,
        created_at: parse_ts(&created_at)?,
    })
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, service_id, provider_id, customer_id, booking_date, start_time, end_time, status, price, currency, notes, created_at, updated_at";

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, service_id, provider_id, customer_id, booking_date, start_time, end_time, status, price, currency, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            booking.id,
            booking.service_id,
            booking.provider_id,
            booking.customer_id,
            fmt_date(&booking.booking_date),
            fmt_time(&booking.start_time),
            fmt_time(&booking.end_time),
            booking.status.as_str(),
            booking.price.to_string(),
            booking.currency,
            booking.notes,
            fmt_ts(&booking.created_at),
            fmt_ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

/// Moves an existing booking to a new date/time span, keeping its id and status.
pub fn update_booking_slot(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET booking_date = ?1, start_time = ?2, end_time = ?3, price = ?4, notes = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            fmt_date(&booking.booking_date),
            fmt_time(&booking.start_time),
            fmt_time(&booking.end_time),
            booking.price.to_string(),
            booking.notes,
            fmt_ts(&booking.updated_at),
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    updated_at: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), fmt_ts(updated_at), id],
    )?;
    Ok(count > 0)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let row = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    row.transpose()
}

/// Bookings that still hold slots on `date`.
pub fn get_service_bookings(
    conn: &Connection,
    service_id: &str,
    date: &NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE service_id = ?1 AND booking_date = ?2 AND status NOT IN ('cancelled', 'rejected')
         ORDER BY start_time ASC"
    ))?;

    let rows = stmt.query_map(params![service_id, fmt_date(date)], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_provider_bookings(
    conn: &Connection,
    provider_id: &str,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE provider_id = ?1 AND (?2 IS NULL OR status = ?2)
         ORDER BY booking_date DESC, start_time DESC LIMIT ?3"
    ))?;

    let rows = stmt.query_map(
        params![provider_id, status_filter.map(|s| s.as_str()), limit],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let booking_date: String = row.get(4)?;
    let start_time: String = row.get(5)?;
    let end_time: String = row.get(6)?;
    let status_str: String = row.get(7)?;
    let price: String = row.get(8)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;

    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow!("bad booking status in store: {status_str}"))?;

    Ok(Booking {
        id: row.get(0)?,
        service_id: row.get(1)?,
        provider_id: row.get(2)?,
        customer_id: row.get(3)?,
        booking_date: parse_date(&booking_date)?,
        start_time: parse_time(&start_time)?,
        end_time: parse_time(&end_time)?,
        status,
        price: parse_price(&price)?,
        currency: row.get(9)?,
        notes: row.get(10)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

// ── Booking Events ──

pub fn insert_booking_event(
    conn: &Connection,
    booking: &Booking,
    kind: &str,
) -> anyhow::Result<BookingEvent> {
    let created_at = fmt_ts(&now_ts());
    conn.execute(
        "INSERT INTO booking_events (booking_id, service_id, provider_id, kind, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            booking.id,
            booking.service_id,
            booking.provider_id,
            kind,
            booking.status.as_str(),
            created_at,
        ],
    )?;

    Ok(BookingEvent {
        id: conn.last_insert_rowid(),
        booking_id: booking.id.clone(),
        service_id: booking.service_id.clone(),
        provider_id: booking.provider_id.clone(),
        kind: kind.to_string(),
        status: booking.status.as_str().to_string(),
        created_at,
    })
}

pub fn get_booking_events_since(
    conn: &Connection,
    since_id: i64,
) -> anyhow::Result<Vec<BookingEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, service_id, provider_id, kind, status, created_at
         FROM booking_events WHERE id > ?1
         ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![since_id], |row| {
        Ok(BookingEvent {
            id: row.get(0)?,
            booking_id: row.get(1)?,
            service_id: row.get(2)?,
            provider_id: row.get(3)?,
            kind: row.get(4)?,
            status: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;

    let mut events = vec![];
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}
