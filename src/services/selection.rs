//! Headless slot-selection reducer.
//!
//! A selection is always empty or a contiguous run of indices into the day's
//! slot list, so a submitted booking is one continuous appointment.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::TimeSlot;
use crate::services::timeutil::{self, TimeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    Empty,
    Selecting { first: usize, last: usize },
    Confirmed { first: usize, last: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    Click(usize),
    Next,
    Back,
    /// The date changed; the old slot indices no longer mean anything.
    Clear,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SelectionError {
    #[error("no slots selected")]
    Empty,

    #[error("{0} is not a slot on this day")]
    UnknownSlot(String),

    #[error("selected slots must be contiguous")]
    NotContiguous,

    #[error("slot {0} is fully booked")]
    Unavailable(String),
}

/// What a selection turns into once the customer confirms it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingDraft {
    #[serde(with = "crate::models::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::models::hhmm")]
    pub end_time: NaiveTime,
    pub slot_count: usize,
    pub total_price: Decimal,
}

impl Selection {
    pub fn apply(self, event: SelectionEvent, slots: &[TimeSlot]) -> Selection {
        match (self, event) {
            (_, SelectionEvent::Clear) => Selection::Empty,

            (Selection::Empty, SelectionEvent::Click(i)) => {
                if is_open(slots, i) {
                    Selection::Selecting { first: i, last: i }
                } else {
                    self
                }
            }
            (Selection::Selecting { first, last }, SelectionEvent::Click(i)) => {
                click_while_selecting(first, last, i, slots)
            }
            (Selection::Selecting { first, last }, SelectionEvent::Next) => {
                Selection::Confirmed { first, last }
            }
            (Selection::Confirmed { first, last }, SelectionEvent::Back) => {
                Selection::Selecting { first, last }
            }

            // Next with nothing selected, Back outside confirmation and clicks
            // on the confirmation step leave the selection untouched.
            _ => self,
        }
    }

    pub fn range(&self) -> Option<(usize, usize)> {
        match *self {
            Selection::Empty => None,
            Selection::Selecting { first, last } | Selection::Confirmed { first, last } => {
                Some((first, last))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.range().map(|(first, last)| last - first + 1).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.range().is_none()
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Selection::Confirmed { .. })
    }

    pub fn contains(&self, index: usize) -> bool {
        self.range()
            .map(|(first, last)| (first..=last).contains(&index))
            .unwrap_or(false)
    }

    pub fn selected_times(&self, slots: &[TimeSlot]) -> Vec<NaiveTime> {
        match self.range() {
            Some((first, last)) => slots
                .get(first..=last)
                .map(|run| run.iter().map(|s| s.time).collect())
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Start, end and price of the appointment this selection describes.
    /// Returns `None` for an empty selection.
    pub fn derive(
        &self,
        slots: &[TimeSlot],
        duration_minutes: u32,
        unit_price: Decimal,
    ) -> Result<Option<BookingDraft>, TimeError> {
        let times = self.selected_times(slots);
        let (Some(first), Some(last)) = (times.first(), times.last()) else {
            return Ok(None);
        };
        Ok(Some(BookingDraft {
            start_time: *first,
            end_time: timeutil::add_minutes(*last, duration_minutes)?,
            slot_count: times.len(),
            total_price: unit_price * Decimal::from(times.len() as u64),
        }))
    }

    /// Rebuilds a selection from slot start times, checking that they form a
    /// contiguous run of open slots. Used to re-validate a submission against
    /// freshly computed availability.
    pub fn from_times(slots: &[TimeSlot], times: &[NaiveTime]) -> Result<Selection, SelectionError> {
        if times.is_empty() {
            return Err(SelectionError::Empty);
        }

        let mut indices = Vec::with_capacity(times.len());
        for time in times {
            let index = slots
                .iter()
                .position(|s| s.time == *time)
                .ok_or_else(|| SelectionError::UnknownSlot(timeutil::format_time(*time)))?;
            indices.push(index);
        }
        indices.sort_unstable();
        indices.dedup();

        if indices.windows(2).any(|w| w[1] != w[0] + 1) {
            return Err(SelectionError::NotContiguous);
        }
        if let Some(full) = indices.iter().find(|&&i| !slots[i].available) {
            return Err(SelectionError::Unavailable(timeutil::format_time(slots[*full].time)));
        }

        let first = indices[0];
        let last = indices[indices.len() - 1];
        Ok(Selection::Selecting { first, last })
    }
}

fn is_open(slots: &[TimeSlot], index: usize) -> bool {
    slots.get(index).map(|s| s.available).unwrap_or(false)
}

fn all_open(slots: &[TimeSlot], from: usize, to: usize) -> bool {
    slots
        .get(from..=to)
        .map(|run| run.iter().all(|s| s.available))
        .unwrap_or(false)
}

fn click_while_selecting(first: usize, last: usize, i: usize, slots: &[TimeSlot]) -> Selection {
    if i >= slots.len() {
        return Selection::Selecting { first, last };
    }

    if (first..=last).contains(&i) {
        return match (i == first, i == last) {
            (true, true) => Selection::Empty,
            (true, false) => Selection::Selecting { first: first + 1, last },
            (false, true) => Selection::Selecting { first, last: last - 1 },
            // Dropping an interior slot would leave a gap.
            (false, false) => Selection::Empty,
        };
    }

    if !slots[i].available {
        return Selection::Selecting { first, last };
    }

    if i == last + 1 && all_open(slots, last + 1, i) {
        return Selection::Selecting { first, last: i };
    }
    if first > 0 && i == first - 1 && all_open(slots, i, first - 1) {
        return Selection::Selecting { first: i, last };
    }

    Selection::Selecting { first: i, last: i }
}
