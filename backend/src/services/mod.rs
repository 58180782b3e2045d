//! Business logic services for the Pocket Farm server

pub mod notification;
pub mod reminders;
pub mod schedule;
pub mod weather;

pub use notification::NotificationService;
pub use reminders::{ReminderSweeper, SweepReport};
pub use schedule::ScheduleService;
pub use weather::WeatherService;
