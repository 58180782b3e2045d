//! Crop schedule models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// A user's care schedule for one crop in their garden
///
/// `crop_name` is the identity key within a user's garden. `next_watering` and
/// the `watered` flag are maintained by the schedule service; clients only
/// reflect what the service reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropScheduleRecord {
    pub crop_name: String,
    /// Day watering was last recorded. `None` until the first watering.
    pub last_watered: Option<NaiveDate>,
    /// Days from the anchor date to the expected harvest
    pub growing_time_days: u32,
    pub watering_frequency_days: u32,
    pub fertilization_frequency_days: u32,
    pub next_watering: NaiveDate,
    /// Whether watering has been recorded for the current due cycle
    pub watered: bool,
}

impl CropScheduleRecord {
    /// Create an unanchored record that is due on `today`
    pub fn new(
        crop_name: impl Into<String>,
        profile: &CareProfile,
        today: NaiveDate,
    ) -> Self {
        Self {
            crop_name: crop_name.into(),
            last_watered: None,
            growing_time_days: profile.growing_time_days,
            watering_frequency_days: profile.watering_frequency_days,
            fertilization_frequency_days: profile.fertilization_frequency_days,
            next_watering: today,
            watered: false,
        }
    }
}

/// Reference care parameters for a crop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareProfile {
    pub growing_time_days: u32,
    pub watering_frequency_days: u32,
    pub fertilization_frequency_days: u32,
}

/// Request body for creating a schedule when a crop joins a garden
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub user_id: UserId,
    pub crop_name: String,
}

/// Request body for a watering update
///
/// Carries the target state rather than a toggle instruction so that a
/// retried request cannot flip the flag twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WateringUpdate {
    pub watered: bool,
}

/// Kind of care a reminder refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareKind {
    Watering,
    Fertilization,
}

impl CareKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CareKind::Watering => "watering",
            CareKind::Fertilization => "fertilization",
        }
    }
}

/// A care reminder pushed to a user's room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareReminder {
    pub crop_name: String,
    pub kind: CareKind,
    pub due_on: NaiveDate,
    pub message: String,
}

impl CareReminder {
    pub fn watering(crop_name: &str, due_on: NaiveDate) -> Self {
        Self {
            crop_name: crop_name.to_string(),
            kind: CareKind::Watering,
            due_on,
            message: format!("Time to water your {} today!", crop_name),
        }
    }

    pub fn fertilization(crop_name: &str, due_on: NaiveDate) -> Self {
        Self {
            crop_name: crop_name.to_string(),
            kind: CareKind::Fertilization,
            due_on,
            message: format!("Your {} is due for fertilizing today.", crop_name),
        }
    }
}
