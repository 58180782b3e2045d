//! Weather data models

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::GpsCoordinates;

/// Current conditions for a user's location, pushed for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub observed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GpsCoordinates>,
    pub temperature_celsius: Decimal,
    pub humidity_percent: i32,
    pub wind_speed_mps: Decimal,
    /// Rain volume over the last hour, when the provider reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain_1h_mm: Option<Decimal>,
    /// Provider condition group, e.g. "Rain", "Clear"
    pub condition: String,
    #[serde(default)]
    pub description: String,
}

/// Types of weather alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    HeavyRain,
    StrongWind,
    HighTemperature,
    LowTemperature,
    HighHumidity,
    #[serde(other)]
    Generic,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::HeavyRain => "heavy_rain",
            AlertType::StrongWind => "strong_wind",
            AlertType::HighTemperature => "high_temperature",
            AlertType::LowTemperature => "low_temperature",
            AlertType::HighHumidity => "high_humidity",
            AlertType::Generic => "generic",
        }
    }

    /// Default user-facing message for this alert type
    pub fn default_message(&self) -> &'static str {
        match self {
            AlertType::HeavyRain => "Heavy rain alert! Consider protecting your plants.",
            AlertType::StrongWind => "Strong winds detected! Secure your plants.",
            AlertType::HighTemperature => "High temperature alert! Ensure proper watering.",
            AlertType::LowTemperature => "Low temperature alert! Protect sensitive plants.",
            AlertType::HighHumidity => "High humidity alert! Watch for fungal diseases.",
            AlertType::Generic => "Weather alert for your garden.",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reading that triggered an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlertValue {
    Number(Decimal),
    Text(String),
}

/// A weather alert delivered to a user's room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub value: AlertValue,
}

impl AlertEvent {
    pub fn new(alert_type: AlertType, value: AlertValue) -> Self {
        Self {
            alert_type,
            message: alert_type.default_message().to_string(),
            value,
        }
    }
}

/// Threshold configuration for weather alerts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub heavy_rain_mm_per_hour: Decimal,
    pub strong_wind_kmh: Decimal,
    pub high_temperature_celsius: Decimal,
    pub low_temperature_celsius: Decimal,
    pub high_humidity_percent: i32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            heavy_rain_mm_per_hour: Decimal::from(10),
            strong_wind_kmh: Decimal::from(30),
            high_temperature_celsius: Decimal::from(35),
            low_temperature_celsius: Decimal::from(5),
            high_humidity_percent: 85,
        }
    }
}
