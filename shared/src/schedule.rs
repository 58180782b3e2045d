//! Recurrence calculations for crop care schedules
//!
//! Every function here is pure: callers pass `today` explicitly and nothing
//! reads the clock. Dates are calendar days with no time-of-day component.
//!
//! The anchor of a schedule is the day it was last watered, or `today` when the
//! crop has never been watered. Watering and fertilization dates step forward
//! from the anchor until the expected harvest (`anchor + growing_time_days`).

use chrono::{DateTime, Days, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::CropScheduleRecord;

/// Errors raised for schedule parameters that cannot produce a recurrence
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("{field} must be at least 1 day")]
    ZeroFrequency { field: &'static str },

    #[error("Date arithmetic overflowed adding {days} days to {from}")]
    DateOverflow { from: NaiveDate, days: u64 },
}

/// Checked `date + days`
fn add_days(from: NaiveDate, days: u64) -> Result<NaiveDate, ScheduleError> {
    from.checked_add_days(Days::new(days))
        .ok_or(ScheduleError::DateOverflow { from, days })
}

fn require_frequency(frequency_days: u32, field: &'static str) -> Result<u64, ScheduleError> {
    if frequency_days == 0 {
        return Err(ScheduleError::ZeroFrequency { field });
    }
    Ok(u64::from(frequency_days))
}

/// Anchor date of a record: last watering, or `today` if never watered
pub fn anchor_date(record: &CropScheduleRecord, today: NaiveDate) -> NaiveDate {
    record.last_watered.unwrap_or(today)
}

/// Next unvisited watering step
///
/// A crop that was never watered is due on `today`, since the anchor itself
/// has not been visited. Otherwise the next step is one frequency interval
/// after the last watering.
pub fn next_due_date(
    last_watered: Option<NaiveDate>,
    frequency_days: u32,
    today: NaiveDate,
) -> Result<NaiveDate, ScheduleError> {
    let step = require_frequency(frequency_days, "frequency_days")?;
    match last_watered {
        None => Ok(today),
        Some(last) => add_days(last, step),
    }
}

/// Whether watering is due on `today`
pub fn is_due_today(record: &CropScheduleRecord, today: NaiveDate) -> bool {
    record.next_watering == today
}

/// Whether watering is due on the calendar day of `at`, whatever the time of day
pub fn is_due_at<Tz: TimeZone>(record: &CropScheduleRecord, at: &DateTime<Tz>) -> bool {
    is_due_today(record, at.date_naive())
}

/// Whether the due date has already passed without a recorded watering
pub fn is_overdue(record: &CropScheduleRecord, today: NaiveDate) -> bool {
    !record.watered && record.next_watering < today
}

/// Expected harvest: anchor plus the growing time
pub fn expected_harvest_date(
    record: &CropScheduleRecord,
    today: NaiveDate,
) -> Result<NaiveDate, ScheduleError> {
    add_days(anchor_date(record, today), u64::from(record.growing_time_days))
}

/// Finite sequence of dates from `start` to `end` (inclusive) in fixed steps
#[derive(Debug, Clone)]
pub struct RecurrenceDates {
    next: Option<NaiveDate>,
    end: NaiveDate,
    step: Days,
}

impl RecurrenceDates {
    fn new(start: NaiveDate, end: NaiveDate, step_days: u64) -> Self {
        Self {
            next: Some(start),
            end,
            step: Days::new(step_days),
        }
    }
}

impl Iterator for RecurrenceDates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next.filter(|date| *date <= self.end)?;
        self.next = current.checked_add_days(self.step);
        Some(current)
    }
}

fn recurrence(
    record: &CropScheduleRecord,
    today: NaiveDate,
    frequency_days: u32,
    field: &'static str,
) -> Result<RecurrenceDates, ScheduleError> {
    let step = require_frequency(frequency_days, field)?;
    let start = anchor_date(record, today);
    let end = expected_harvest_date(record, today)?;
    Ok(RecurrenceDates::new(start, end, step))
}

/// Watering dates across the growing window, for calendar display
pub fn watering_dates(
    record: &CropScheduleRecord,
    today: NaiveDate,
) -> Result<RecurrenceDates, ScheduleError> {
    recurrence(
        record,
        today,
        record.watering_frequency_days,
        "watering_frequency_days",
    )
}

/// Fertilization dates across the growing window, for calendar display
pub fn fertilization_dates(
    record: &CropScheduleRecord,
    today: NaiveDate,
) -> Result<RecurrenceDates, ScheduleError> {
    recurrence(
        record,
        today,
        record.fertilization_frequency_days,
        "fertilization_frequency_days",
    )
}

/// First fertilization date on or after `today`, if the window has not ended
pub fn next_fertilization_date(
    record: &CropScheduleRecord,
    today: NaiveDate,
) -> Result<Option<NaiveDate>, ScheduleError> {
    Ok(fertilization_dates(record, today)?.find(|date| *date >= today))
}

/// Whether `today` is one of the record's fertilization dates
pub fn is_fertilization_due(
    record: &CropScheduleRecord,
    today: NaiveDate,
) -> Result<bool, ScheduleError> {
    Ok(next_fertilization_date(record, today)? == Some(today))
}

/// Advance a record whose watered cycle has ended
///
/// A watered record moves to the next step once the day it was watered is in
/// the past, and its `watered` flag resets for the new cycle. Unwatered
/// records keep their due date, even when overdue. Returns whether the record
/// changed.
pub fn roll_forward(
    record: &mut CropScheduleRecord,
    today: NaiveDate,
) -> Result<bool, ScheduleError> {
    if !record.watered {
        return Ok(false);
    }
    let watered_on = record.last_watered.unwrap_or(record.next_watering);
    if watered_on >= today {
        return Ok(false);
    }
    record.next_watering = next_due_date(
        Some(watered_on),
        record.watering_frequency_days,
        today,
    )?;
    record.last_watered = Some(watered_on);
    record.watered = false;
    Ok(true)
}

/// What the watering control should offer for a record
///
/// Derived from `(watered, due today)` on every render; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WateringAction {
    /// Already watered this cycle; tapping undoes it
    Undo,
    /// Nothing due today; the control is disabled
    NotDue,
    /// Due today; tapping records the watering
    MarkWatered,
}

impl WateringAction {
    pub fn from_state(watered: bool, due_today: bool) -> Self {
        if watered {
            WateringAction::Undo
        } else if !due_today {
            WateringAction::NotDue
        } else {
            WateringAction::MarkWatered
        }
    }

    pub fn for_record(record: &CropScheduleRecord, today: NaiveDate) -> Self {
        Self::from_state(record.watered, is_due_today(record, today))
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, WateringAction::NotDue)
    }

    pub fn label(&self) -> &'static str {
        match self {
            WateringAction::Undo => "Already Watered (Click to Undo)",
            WateringAction::NotDue => "No Watering Today",
            WateringAction::MarkWatered => "Mark as Watered",
        }
    }
}
