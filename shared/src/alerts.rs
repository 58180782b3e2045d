//! Weather alert evaluation
//!
//! Compares a snapshot against configured thresholds. Alerts come out in a
//! fixed order: rain, wind, temperature, humidity.

use rust_decimal::Decimal;

use crate::models::{AlertEvent, AlertThresholds, AlertType, AlertValue, WeatherSnapshot};

/// Condition group the weather provider reports for rainfall
pub const RAIN_CONDITION: &str = "Rain";

/// Convert a wind speed from metres per second to kilometres per hour
pub fn mps_to_kmh(mps: Decimal) -> Decimal {
    mps * Decimal::new(36, 1)
}

/// Evaluate a snapshot and return every alert it triggers
pub fn evaluate_alerts(snapshot: &WeatherSnapshot, thresholds: &AlertThresholds) -> Vec<AlertEvent> {
    let mut alerts = Vec::new();

    let heavy_volume = snapshot
        .rain_1h_mm
        .filter(|mm| *mm >= thresholds.heavy_rain_mm_per_hour);
    if let Some(mm) = heavy_volume {
        alerts.push(AlertEvent::new(AlertType::HeavyRain, AlertValue::Number(mm)));
    } else if snapshot.condition == RAIN_CONDITION {
        alerts.push(AlertEvent::new(
            AlertType::HeavyRain,
            AlertValue::Text(snapshot.condition.clone()),
        ));
    }

    let wind_kmh = mps_to_kmh(snapshot.wind_speed_mps);
    if wind_kmh >= thresholds.strong_wind_kmh {
        alerts.push(AlertEvent::new(
            AlertType::StrongWind,
            AlertValue::Number(wind_kmh.normalize()),
        ));
    }

    let temperature = snapshot.temperature_celsius;
    if temperature >= thresholds.high_temperature_celsius {
        alerts.push(AlertEvent::new(
            AlertType::HighTemperature,
            AlertValue::Number(temperature),
        ));
    }
    if temperature <= thresholds.low_temperature_celsius {
        alerts.push(AlertEvent::new(
            AlertType::LowTemperature,
            AlertValue::Number(temperature),
        ));
    }

    if snapshot.humidity_percent >= thresholds.high_humidity_percent {
        alerts.push(AlertEvent::new(
            AlertType::HighHumidity,
            AlertValue::Number(Decimal::from(snapshot.humidity_percent)),
        ));
    }

    alerts
}
