//! WebAssembly module for Pocket Farm
//!
//! Provides client-side computation for:
//! - Watering and fertilization calendar dates
//! - Expected harvest dates
//! - Due-today checks and the watering button state
//!
//! Records cross the boundary as JSON in the same shape the schedule service
//! returns. Dates are `YYYY-MM-DD` strings in the browser's local calendar.

use chrono::NaiveDate;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::schedule::*;
pub use shared::types::*;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn parse_record(record_json: &str) -> Result<CropScheduleRecord, String> {
    serde_json::from_str(record_json).map_err(|e| format!("Invalid schedule JSON: {}", e))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| format!("Invalid date '{}': {}", value, e))
}

fn format_dates(dates: impl Iterator<Item = NaiveDate>) -> Result<String, String> {
    let formatted: Vec<String> = dates.map(|d| d.format(DATE_FORMAT).to_string()).collect();
    serde_json::to_string(&formatted).map_err(|e| e.to_string())
}

fn watering_dates_inner(record_json: &str, today: &str) -> Result<String, String> {
    let record = parse_record(record_json)?;
    let dates = watering_dates(&record, parse_date(today)?).map_err(|e| e.to_string())?;
    format_dates(dates)
}

fn fertilization_dates_inner(record_json: &str, today: &str) -> Result<String, String> {
    let record = parse_record(record_json)?;
    let dates = fertilization_dates(&record, parse_date(today)?).map_err(|e| e.to_string())?;
    format_dates(dates)
}

fn expected_harvest_inner(record_json: &str, today: &str) -> Result<String, String> {
    let record = parse_record(record_json)?;
    let harvest = expected_harvest_date(&record, parse_date(today)?).map_err(|e| e.to_string())?;
    Ok(harvest.format(DATE_FORMAT).to_string())
}

fn is_due_today_inner(record_json: &str, today: &str) -> Result<bool, String> {
    let record = parse_record(record_json)?;
    Ok(is_due_today(&record, parse_date(today)?))
}

fn watering_button_inner(record_json: &str, today: &str) -> Result<String, String> {
    let record = parse_record(record_json)?;
    let action = WateringAction::for_record(&record, parse_date(today)?);
    let button = serde_json::json!({
        "action": action,
        "label": action.label(),
        "enabled": action.is_enabled(),
    });
    Ok(button.to_string())
}

/// Watering dates for a schedule record, as a JSON array of date strings
#[wasm_bindgen]
pub fn schedule_watering_dates(record_json: &str, today: &str) -> Result<String, JsValue> {
    watering_dates_inner(record_json, today).map_err(|e| JsValue::from_str(&e))
}

/// Fertilization dates for a schedule record, as a JSON array of date strings
#[wasm_bindgen]
pub fn schedule_fertilization_dates(record_json: &str, today: &str) -> Result<String, JsValue> {
    fertilization_dates_inner(record_json, today).map_err(|e| JsValue::from_str(&e))
}

/// Expected harvest date for a schedule record
#[wasm_bindgen]
pub fn schedule_expected_harvest(record_json: &str, today: &str) -> Result<String, JsValue> {
    expected_harvest_inner(record_json, today).map_err(|e| JsValue::from_str(&e))
}

/// Whether watering is due on `today`
#[wasm_bindgen]
pub fn schedule_is_due_today(record_json: &str, today: &str) -> Result<bool, JsValue> {
    is_due_today_inner(record_json, today).map_err(|e| JsValue::from_str(&e))
}

/// Watering button state: `{"action", "label", "enabled"}`
#[wasm_bindgen]
pub fn schedule_watering_button(record_json: &str, today: &str) -> Result<String, JsValue> {
    watering_button_inner(record_json, today).map_err(|e| JsValue::from_str(&e))
}
