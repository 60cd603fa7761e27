use chrono::{NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::models::{
    Booking, BookingPolicy, DailyAvailability, DaySchedule, ScheduleSource, SpecialDateOverride,
    TimeSlot, WeeklyAvailability,
};
use crate::services::timeutil::{self, day_of_week, minutes_of_day};

/// Picks the schedule that governs `date`. A special-date override replaces
/// the weekly entry outright; when several overrides exist for the date the
/// most recently created one is used, ties going to the later entry in
/// `overrides`.
pub fn resolve_schedule(
    date: NaiveDate,
    weekly: &[WeeklyAvailability],
    overrides: &[SpecialDateOverride],
) -> Option<DaySchedule> {
    let mut matching: Vec<&SpecialDateOverride> =
        overrides.iter().filter(|o| o.special_date == date).collect();

    if matching.len() > 1 {
        tracing::warn!(
            date = %date,
            count = matching.len(),
            "multiple special-date overrides for one date, using the newest"
        );
    }
    // Stable: overrides sharing a timestamp keep their insertion order.
    matching.sort_by_key(|o| o.created_at);

    if let Some(ov) = matching.last() {
        return Some(match (ov.is_available, ov.start_time, ov.end_time) {
            (true, Some(start), Some(end)) if start < end => DaySchedule {
                source: ScheduleSource::SpecialDate,
                is_available: true,
                start_time: start,
                end_time: end,
                note: ov.note.clone(),
            },
            (true, _, _) => {
                tracing::warn!(override_id = %ov.id, "open special date has no usable hours, treating as closed");
                DaySchedule::closed(ScheduleSource::SpecialDate, ov.note.clone())
            }
            (false, _, _) => DaySchedule::closed(ScheduleSource::SpecialDate, ov.note.clone()),
        });
    }

    let dow = day_of_week(date);
    weekly.iter().find(|w| w.day_of_week == dow).map(|w| DaySchedule {
        source: ScheduleSource::Weekly,
        is_available: w.is_available && w.start_time < w.end_time,
        start_time: w.start_time,
        end_time: w.end_time,
        note: None,
    })
}

/// Drops the booking being edited so it does not compete with itself.
pub fn exclude_booking(bookings: Vec<Booking>, existing_booking_id: Option<&str>) -> Vec<Booking> {
    match existing_booking_id {
        Some(id) => bookings.into_iter().filter(|b| b.id != id).collect(),
        None => bookings,
    }
}

/// Computes the bookable slots of one day. Times are wall-clock in the
/// provider's timezone; local times that do not exist there (DST gaps) yield
/// a slot with zero capacity. The advance-booking window is not checked here.
pub fn get_daily_availability(
    date: NaiveDate,
    schedule: Option<&DaySchedule>,
    bookings: &[Booking],
    policy: &BookingPolicy,
    timezone: Tz,
) -> DailyAvailability {
    let dow = day_of_week(date);

    let schedule = match schedule {
        Some(s) if s.is_available => s,
        _ => return DailyAvailability::closed(date, dow),
    };

    let duration = policy.duration_minutes;
    if duration == 0 {
        tracing::warn!("booking policy has zero slot duration, no slots generated");
        return DailyAvailability::closed(date, dow);
    }

    let live: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.booking_date == date && b.occupies_slots())
        .collect();

    let capacity = policy.max_concurrent_bookings;
    let day_end = minutes_of_day(schedule.end_time);
    let mut cursor = minutes_of_day(schedule.start_time);
    let mut slots = Vec::new();

    while cursor.saturating_add(duration) <= day_end {
        let slot_start = cursor;
        let slot_end = cursor + duration;
        cursor += duration;

        let Some(time) = NaiveTime::from_hms_opt(slot_start / 60, slot_start % 60, 0) else {
            continue;
        };

        // A wall-clock time skipped by a DST jump keeps its place in the grid
        // with no capacity, so neighbouring list entries stay adjacent in time.
        if timezone.from_local_datetime(&date.and_time(time)).earliest().is_none() {
            slots.push(TimeSlot {
                time,
                available: false,
                capacity: 0,
                booked: 0,
            });
            continue;
        }

        let booked = live
            .iter()
            .filter(|b| {
                minutes_of_day(b.start_time) < slot_end && minutes_of_day(b.end_time) > slot_start
            })
            .count() as u32;

        slots.push(TimeSlot {
            time,
            available: booked < capacity,
            capacity,
            booked,
        });
    }

    DailyAvailability {
        date,
        day_of_week: dow,
        is_available: true,
        slots,
    }
}

/// Resolves the schedule and computes availability for `date` in one step.
pub fn compute_for_date(
    date: NaiveDate,
    weekly: &[WeeklyAvailability],
    overrides: &[SpecialDateOverride],
    bookings: Vec<Booking>,
    existing_booking_id: Option<&str>,
    policy: &BookingPolicy,
    timezone: &str,
) -> DailyAvailability {
    let schedule = resolve_schedule(date, weekly, overrides);
    let bookings = exclude_booking(bookings, existing_booking_id);
    get_daily_availability(
        date,
        schedule.as_ref(),
        &bookings,
        policy,
        timeutil::parse_timezone(timezone),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;
    use chrono::NaiveDateTime;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn t(s: &str) -> NaiveTime {
        timeutil::parse_time(s).unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        timeutil::parse_date(s).unwrap()
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn weekly(day: u8, start: &str, end: &str, open: bool) -> WeeklyAvailability {
        WeeklyAvailability {
            service_id: "svc".to_string(),
            day_of_week: day,
            start_time: t(start),
            end_time: t(end),
            is_available: open,
        }
    }

    fn special(id: &str, date: &str, open: bool, hours: Option<(&str, &str)>, created: &str) -> SpecialDateOverride {
        SpecialDateOverride {
            id: id.to_string(),
            service_id: "svc".to_string(),
            special_date: d(date),
            is_available: open,
            note: None,
            start_time: hours.map(|h| t(h.0)),
            end_time: hours.map(|h| t(h.1)),
            created_at: ts(created),
        }
    }

    fn booking(id: &str, date: &str, start: &str, end: &str, status: BookingStatus) -> Booking {
        let now = ts("2025-06-01 08:00");
        Booking {
            id: id.to_string(),
            service_id: "svc".to_string(),
            provider_id: "prov".to_string(),
            customer_id: "cust".to_string(),
            booking_date: d(date),
            start_time: t(start),
            end_time: t(end),
            status,
            price: Decimal::new(5000, 2),
            currency: "USD".to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn policy(duration: u32, capacity: u32) -> BookingPolicy {
        BookingPolicy {
            duration_minutes: duration,
            max_concurrent_bookings: capacity,
            ..BookingPolicy::default()
        }
    }

    fn open_day(start: &str, end: &str) -> DaySchedule {
        DaySchedule {
            source: ScheduleSource::Weekly,
            is_available: true,
            start_time: t(start),
            end_time: t(end),
            note: None,
        }
    }

    fn times(day: &DailyAvailability) -> Vec<String> {
        day.slots.iter().map(|s| timeutil::format_time(s.time)).collect()
    }

    #[test]
    fn test_full_day_of_hourly_slots() {
        let day = get_daily_availability(
            d("2025-06-16"),
            Some(&open_day("09:00", "17:00")),
            &[],
            &policy(60, 1),
            chrono_tz::UTC,
        );
        assert!(day.is_available);
        assert_eq!(day.day_of_week, 1);
        assert_eq!(
            times(&day),
            vec!["09:00", "10:00", "11:00", "12:00", "13:00", "14:00", "15:00", "16:00"]
        );
    }

    #[test]
    fn test_partial_last_slot_dropped() {
        let day = get_daily_availability(
            d("2025-06-16"),
            Some(&open_day("09:00", "11:30")),
            &[],
            &policy(60, 1),
            chrono_tz::UTC,
        );
        assert_eq!(times(&day), vec!["09:00", "10:00"]);
    }

    #[test]
    fn test_closed_day_ignores_bookings() {
        let closed = DaySchedule::closed(ScheduleSource::Weekly, None);
        let bookings = vec![booking("b1", "2025-06-16", "09:00", "10:00", BookingStatus::Confirmed)];
        let day = get_daily_availability(d("2025-06-16"), Some(&closed), &bookings, &policy(60, 1), chrono_tz::UTC);
        assert!(!day.is_available);
        assert!(day.slots.is_empty());

        let none = get_daily_availability(d("2025-06-16"), None, &bookings, &policy(60, 1), chrono_tz::UTC);
        assert!(!none.is_available);
        assert!(none.slots.is_empty());
    }

    #[test]
    fn test_booked_counts_and_capacity() {
        let bookings = vec![
            booking("b1", "2025-06-16", "09:00", "11:00", BookingStatus::Confirmed),
            booking("b2", "2025-06-16", "10:00", "11:00", BookingStatus::Pending),
            booking("b3", "2025-06-16", "10:00", "11:00", BookingStatus::Cancelled),
            booking("b4", "2025-06-16", "11:00", "12:00", BookingStatus::Rejected),
            booking("b5", "2025-06-17", "09:00", "10:00", BookingStatus::Confirmed),
        ];
        let day = get_daily_availability(
            d("2025-06-16"),
            Some(&open_day("09:00", "12:00")),
            &bookings,
            &policy(60, 2),
            chrono_tz::UTC,
        );
        let booked: Vec<u32> = day.slots.iter().map(|s| s.booked).collect();
        assert_eq!(booked, vec![1, 2, 0]);
        let available: Vec<bool> = day.slots.iter().map(|s| s.available).collect();
        assert_eq!(available, vec![true, false, true]);
        for slot in &day.slots {
            assert_eq!(slot.capacity, 2);
            assert_eq!(slot.available, slot.booked < slot.capacity);
        }
    }

    #[test]
    fn test_overbooked_slot_reports_count() {
        let bookings = vec![
            booking("b1", "2025-06-16", "09:00", "10:00", BookingStatus::Confirmed),
            booking("b2", "2025-06-16", "09:00", "10:00", BookingStatus::Confirmed),
        ];
        let day = get_daily_availability(
            d("2025-06-16"),
            Some(&open_day("09:00", "10:00")),
            &bookings,
            &policy(60, 1),
            chrono_tz::UTC,
        );
        assert_eq!(day.slots[0].booked, 2);
        assert!(!day.slots[0].available);
    }

    #[test]
    fn test_special_date_overrides_weekly() {
        let weekly_entries = vec![weekly(1, "09:00", "17:00", true)];
        let closed = vec![special("s1", "2025-06-16", false, None, "2025-06-01 10:00")];
        let resolved = resolve_schedule(d("2025-06-16"), &weekly_entries, &closed).unwrap();
        assert_eq!(resolved.source, ScheduleSource::SpecialDate);
        assert!(!resolved.is_available);

        let shorter = vec![special("s2", "2025-06-16", true, Some(("10:00", "12:00")), "2025-06-01 10:00")];
        let resolved = resolve_schedule(d("2025-06-16"), &weekly_entries, &shorter).unwrap();
        assert_eq!(resolved.start_time, t("10:00"));
        assert_eq!(resolved.end_time, t("12:00"));

        // Other dates still follow the weekly entry
        let next_monday = resolve_schedule(d("2025-06-23"), &weekly_entries, &closed).unwrap();
        assert_eq!(next_monday.source, ScheduleSource::Weekly);
        assert!(next_monday.is_available);
    }

    #[test]
    fn test_special_date_opens_extra_day() {
        // 2025-06-15 is a Sunday with no weekly entry
        let overrides = vec![special("s1", "2025-06-15", true, Some(("10:00", "13:00")), "2025-06-01 10:00")];
        let day = compute_for_date(d("2025-06-15"), &[], &overrides, vec![], None, &policy(60, 1), "UTC");
        assert_eq!(times(&day), vec!["10:00", "11:00", "12:00"]);
    }

    #[test]
    fn test_open_special_date_without_hours_is_closed() {
        let weekly_entries = vec![weekly(1, "09:00", "17:00", true)];
        let overrides = vec![special("s1", "2025-06-16", true, None, "2025-06-01 10:00")];
        let resolved = resolve_schedule(d("2025-06-16"), &weekly_entries, &overrides).unwrap();
        assert!(!resolved.is_available);
    }

    #[test]
    fn test_newest_duplicate_override_wins() {
        let overrides = vec![
            special("s2", "2025-06-16", true, Some(("10:00", "12:00")), "2025-06-02 10:00"),
            special("s1", "2025-06-16", false, None, "2025-06-01 10:00"),
        ];
        let resolved = resolve_schedule(d("2025-06-16"), &[], &overrides).unwrap();
        assert!(resolved.is_available);
        assert_eq!(resolved.start_time, t("10:00"));
    }

    #[test]
    fn test_same_timestamp_override_later_entry_wins() {
        let overrides = vec![
            special("b", "2025-06-16", false, None, "2025-06-01 10:00"),
            special("a", "2025-06-16", true, Some(("10:00", "12:00")), "2025-06-01 10:00"),
        ];
        let resolved = resolve_schedule(d("2025-06-16"), &[], &overrides).unwrap();
        assert!(resolved.is_available);
    }

    #[test]
    fn test_no_schedule_means_closed() {
        let weekly_entries = vec![weekly(1, "09:00", "17:00", true)];
        assert!(resolve_schedule(d("2025-06-17"), &weekly_entries, &[]).is_none());
        let day = compute_for_date(d("2025-06-17"), &weekly_entries, &[], vec![], None, &policy(60, 1), "UTC");
        assert!(!day.is_available);
        assert!(day.slots.is_empty());
    }

    #[test]
    fn test_self_exclusion_on_edit() {
        let weekly_entries = vec![weekly(1, "09:00", "12:00", true)];
        let bookings = vec![booking("mine", "2025-06-16", "10:00", "11:00", BookingStatus::Confirmed)];

        let others = compute_for_date(d("2025-06-16"), &weekly_entries, &[], bookings.clone(), None, &policy(60, 1), "UTC");
        assert!(!others.slots[1].available);

        let editing = compute_for_date(d("2025-06-16"), &weekly_entries, &[], bookings, Some("mine"), &policy(60, 1), "UTC");
        assert_eq!(editing.slots[1].booked, 0);
        assert!(editing.slots[1].available);
    }

    #[test]
    fn test_dst_gap_slot_has_no_capacity() {
        // Clocks jump from 02:00 to 03:00 in Berlin on 2025-03-30 (a Sunday)
        let day = get_daily_availability(
            d("2025-03-30"),
            Some(&open_day("01:00", "04:00")),
            &[],
            &policy(60, 1),
            timeutil::parse_timezone("Europe/Berlin"),
        );
        assert_eq!(times(&day), vec!["01:00", "02:00", "03:00"]);
        assert_eq!(day.slots[1].capacity, 0);
        assert!(!day.slots[1].available);
        assert!(day.slots[0].available && day.slots[2].available);
    }

    #[test]
    fn test_dst_gap_blocks_selection_across_it() {
        use crate::services::selection::{Selection, SelectionError};

        let day = get_daily_availability(
            d("2025-03-30"),
            Some(&open_day("01:00", "04:00")),
            &[],
            &policy(60, 1),
            timeutil::parse_timezone("Europe/Berlin"),
        );
        assert_eq!(
            Selection::from_times(&day.slots, &[t("01:00"), t("03:00")]),
            Err(SelectionError::NotContiguous)
        );

        let single = Selection::from_times(&day.slots, &[t("03:00")]).unwrap();
        let draft = single.derive(&day.slots, 60, Decimal::ONE).unwrap().unwrap();
        assert_eq!(draft.end_time, t("04:00"));
        assert_eq!(draft.slot_count, 1);
    }

    #[test]
    fn test_zero_duration_yields_closed_day() {
        let day = get_daily_availability(
            d("2025-06-16"),
            Some(&open_day("09:00", "17:00")),
            &[],
            &policy(0, 1),
            chrono_tz::UTC,
        );
        assert!(!day.is_available);
    }

    #[test]
    fn test_monday_morning_scenario() {
        let weekly_entries = vec![weekly(1, "09:00", "12:00", true)];
        let day = compute_for_date(d("2025-06-16"), &weekly_entries, &[], vec![], None, &policy(60, 1), "UTC");
        assert_eq!(times(&day), vec!["09:00", "10:00", "11:00"]);
        assert!(day.slots.iter().all(|s| s.available));
    }

    // ── Properties ──

    fn booking_strategy() -> impl Strategy<Value = Booking> {
        (
            0u32..20,
            1u32..8,
            prop::sample::select(vec![
                BookingStatus::Pending,
                BookingStatus::Confirmed,
                BookingStatus::Completed,
                BookingStatus::Cancelled,
                BookingStatus::Rejected,
            ]),
        )
            .prop_map(|(start, len, status)| {
                // Half-hour steps from 00:00 upward
                let from = start * 30;
                let to = from + len * 30;
                let hhmm = |m: u32| format!("{:02}:{:02}", m / 60, m % 60);
                booking(&format!("b{start}-{len}"), "2025-03-30", &hhmm(from), &hhmm(to), status)
            })
    }

    proptest! {
        #[test]
        fn prop_available_iff_booked_below_capacity(
            bookings in prop::collection::vec(booking_strategy(), 0..12),
            duration in prop::sample::select(vec![15u32, 30, 45, 60, 90]),
            capacity in 1u32..4,
            zone in prop::sample::select(vec!["UTC", "Europe/Berlin"]),
        ) {
            // Berlin skips 02:00-03:00 on this date
            let day = get_daily_availability(
                d("2025-03-30"),
                Some(&open_day("00:00", "12:00")),
                &bookings,
                &policy(duration, capacity),
                timeutil::parse_timezone(zone),
            );

            prop_assert!(day.is_available);
            for pair in day.slots.windows(2) {
                prop_assert_eq!(
                    minutes_of_day(pair[1].time) - minutes_of_day(pair[0].time),
                    duration
                );
            }
            for slot in &day.slots {
                prop_assert_eq!(slot.available, slot.booked < slot.capacity);
                prop_assert!(minutes_of_day(slot.time) + duration <= 12 * 60);
            }
        }

        #[test]
        fn prop_closed_day_has_no_slots(
            bookings in prop::collection::vec(booking_strategy(), 0..12),
            duration in 1u32..240,
        ) {
            let closed = DaySchedule::closed(ScheduleSource::SpecialDate, None);
            let day = get_daily_availability(d("2025-03-30"), Some(&closed), &bookings, &policy(duration, 1), chrono_tz::UTC);
            prop_assert!(!day.is_available);
            prop_assert!(day.slots.is_empty());
        }
    }
}
