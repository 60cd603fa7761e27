pub mod availability;
pub mod booking;
pub mod calendar;
pub mod schedule;
pub mod selection;
pub mod timeutil;
