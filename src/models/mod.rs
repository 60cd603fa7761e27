pub mod availability;
pub mod booking;
pub mod event;
pub mod hhmm;
pub mod policy;
pub mod service;

pub use availability::{DailyAvailability, DaySchedule, ScheduleSource, SpecialDateOverride, TimeSlot, WeeklyAvailability};
pub use booking::{Booking, BookingStatus};
pub use event::BookingEvent;
pub use policy::BookingPolicy;
pub use service::Service;
