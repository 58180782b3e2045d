//! Real-time channel frames
//!
//! Frames are JSON objects of the form `{"event": "...", "data": ...}`.

use serde::{Deserialize, Serialize};

use super::{AlertEvent, CareReminder, WeatherSnapshot};
use crate::types::UserId;

/// Frames sent by the server into a user's room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Acknowledges a `join_room` request
    Joined { room: String },
    WeatherSnapshot(WeatherSnapshot),
    WeatherAlert(Vec<AlertEvent>),
    CareReminder(CareReminder),
    /// Server-side schedule state changed (rollover, creation, removal)
    ScheduleChanged { crop_names: Vec<String> },
    Pong,
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Joined { .. } => "joined",
            ServerEvent::WeatherSnapshot(_) => "weather_snapshot",
            ServerEvent::WeatherAlert(_) => "weather_alert",
            ServerEvent::CareReminder(_) => "care_reminder",
            ServerEvent::ScheduleChanged { .. } => "schedule_changed",
            ServerEvent::Pong => "pong",
        }
    }
}

/// Frames sent by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom { user_id: UserId },
    Ping,
}
