use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingEvent, BookingPolicy, BookingStatus, DailyAvailability, Service};
use crate::services::availability;
use crate::services::selection::{Selection, SelectionError};
use crate::services::timeutil::{self, TimeError};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0} is outside the booking window")]
    OutsideWindow(NaiveDate),

    #[error("the service is closed on {0}")]
    Closed(NaiveDate),

    #[error("slot {0} has already started")]
    InThePast(String),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error("booking belongs to a different service")]
    ServiceMismatch,

    #[error("booking belongs to a different customer")]
    NotOwner,

    #[error("booking {0} can no longer be changed")]
    NotEditable(String),

    #[error("cannot change a booking from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("customers may only cancel, not mark a booking {0}")]
    CustomerAction(&'static str),

    #[error("this booking cannot be cancelled by the customer")]
    CancellationNotAllowed,

    #[error("cancellations must be made at least {hours} hours before the appointment")]
    TooLateToCancel { hours: u32 },
}

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Provider,
    Customer,
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub service_id: String,
    pub customer_id: String,
    pub date: NaiveDate,
    /// Start times of the selected slots.
    pub times: Vec<NaiveTime>,
    pub notes: Option<String>,
    /// When set, that booking is moved instead of a new one being created.
    pub existing_booking_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub booking: Booking,
    pub created: bool,
    pub event: BookingEvent,
}

fn require_service(conn: &Connection, service_id: &str) -> Result<Service, AppError> {
    queries::get_service(conn, service_id)?
        .ok_or_else(|| AppError::NotFound(format!("service {service_id}")))
}

fn require_booking(conn: &Connection, booking_id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))
}

/// Loads everything the calculator needs for one date and runs it.
pub fn load_daily_availability(
    conn: &Connection,
    service: &Service,
    date: NaiveDate,
    existing_booking_id: Option<&str>,
) -> anyhow::Result<DailyAvailability> {
    let weekly = queries::get_weekly_availability(conn, &service.id)?;
    let overrides = queries::get_special_dates(conn, &service.id, Some(&date))?;
    let bookings = queries::get_service_bookings(conn, &service.id, &date)?;

    Ok(availability::compute_for_date(
        date,
        &weekly,
        &overrides,
        bookings,
        existing_booking_id,
        &service.policy,
        &service.timezone,
    ))
}

/// Reserves the requested slots. Availability is recomputed and the booking
/// written inside one immediate transaction, so two customers racing for the
/// last unit of capacity cannot both succeed.
pub fn submit_booking(
    conn: &mut Connection,
    req: &BookingRequest,
    now: DateTime<Utc>,
) -> Result<BookingOutcome, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let service = require_service(&tx, &req.service_id)?;

    let existing = match req.existing_booking_id.as_deref() {
        Some(id) => {
            let booking = require_booking(&tx, id)?;
            if booking.service_id != service.id {
                return Err(BookingError::ServiceMismatch.into());
            }
            if booking.customer_id != req.customer_id {
                return Err(BookingError::NotOwner.into());
            }
            if booking.status.is_terminal() {
                return Err(BookingError::NotEditable(booking.id).into());
            }
            Some(booking)
        }
        None => None,
    };

    if !timeutil::is_date_bookable(
        req.date,
        service.policy.advance_booking_days,
        now,
        &service.timezone,
    ) {
        return Err(BookingError::OutsideWindow(req.date).into());
    }

    let day = load_daily_availability(&tx, &service, req.date, req.existing_booking_id.as_deref())?;
    if !day.is_available {
        return Err(BookingError::Closed(req.date).into());
    }

    let selection = Selection::from_times(&day.slots, &req.times).map_err(BookingError::from)?;
    let draft = selection
        .derive(&day.slots, service.policy.duration_minutes, service.price)
        .map_err(BookingError::from)?
        .ok_or(BookingError::Selection(SelectionError::Empty))?;

    let tz = timeutil::parse_timezone(&service.timezone);
    if timeutil::local_instant(req.date, draft.start_time, tz) <= now {
        return Err(BookingError::InThePast(timeutil::format_time(draft.start_time)).into());
    }

    let stamp = now.naive_utc();
    let (booking, created) = match existing {
        Some(mut booking) => {
            booking.booking_date = req.date;
            booking.start_time = draft.start_time;
            booking.end_time = draft.end_time;
            booking.price = draft.total_price;
            booking.notes = req.notes.clone();
            booking.updated_at = stamp;
            queries::update_booking_slot(&tx, &booking)?;
            (booking, false)
        }
        None => {
            let booking = Booking {
                id: uuid::Uuid::new_v4().to_string(),
                service_id: service.id.clone(),
                provider_id: service.provider_id.clone(),
                customer_id: req.customer_id.clone(),
                booking_date: req.date,
                start_time: draft.start_time,
                end_time: draft.end_time,
                status: initial_status(&service.policy),
                price: draft.total_price,
                currency: service.currency.clone(),
                notes: req.notes.clone(),
                created_at: stamp,
                updated_at: stamp,
            };
            queries::create_booking(&tx, &booking)?;
            (booking, true)
        }
    };

    let event = queries::insert_booking_event(&tx, &booking, if created { "created" } else { "rescheduled" })?;
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        service_id = %booking.service_id,
        date = %booking.booking_date,
        start = %timeutil::format_time(booking.start_time),
        slots = draft.slot_count,
        created,
        "booking saved"
    );

    Ok(BookingOutcome { booking, created, event })
}

pub fn initial_status(policy: &BookingPolicy) -> BookingStatus {
    if policy.require_confirmation {
        BookingStatus::Pending
    } else {
        BookingStatus::Confirmed
    }
}

/// Checks whether `actor` may move `booking` to `next` at instant `now`.
/// Providers may make any allowed transition, customers may only cancel, and
/// any cancellation must come at least `cancellation_policy_hours` before the
/// appointment starts.
pub fn check_status_change(
    booking: &Booking,
    next: BookingStatus,
    actor: Actor,
    policy: &BookingPolicy,
    timezone: &str,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    if !booking.status.can_transition_to(next) {
        return Err(BookingError::InvalidTransition {
            from: booking.status.as_str(),
            to: next.as_str(),
        });
    }

    if actor == Actor::Customer {
        if next != BookingStatus::Cancelled {
            return Err(BookingError::CustomerAction(next.as_str()));
        }
        if !policy.allow_customer_cancellation {
            return Err(BookingError::CancellationNotAllowed);
        }
    }

    // The cancellation window binds both parties.
    if next != BookingStatus::Cancelled {
        return Ok(());
    }

    let starts_at = timeutil::local_instant(
        booking.booking_date,
        booking.start_time,
        timeutil::parse_timezone(timezone),
    );
    if starts_at - now < Duration::hours(policy.cancellation_policy_hours as i64) {
        return Err(BookingError::TooLateToCancel {
            hours: policy.cancellation_policy_hours,
        });
    }
    Ok(())
}

pub fn change_status(
    conn: &Connection,
    booking_id: &str,
    next: BookingStatus,
    actor: Actor,
    customer_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(Booking, BookingEvent), AppError> {
    let mut booking = require_booking(conn, booking_id)?;
    let service = require_service(conn, &booking.service_id)?;

    if actor == Actor::Customer && customer_id != Some(booking.customer_id.as_str()) {
        return Err(BookingError::NotOwner.into());
    }

    check_status_change(&booking, next, actor, &service.policy, &service.timezone, now)?;

    let stamp = now.naive_utc();
    queries::update_booking_status(conn, &booking.id, next, &stamp)?;
    booking.status = next;
    booking.updated_at = stamp;

    let event = queries::insert_booking_event(conn, &booking, next.as_str())?;
    tracing::info!(booking_id = %booking.id, status = next.as_str(), ?actor, "booking status changed");

    Ok((booking, event))
}
