//! HTTP handlers for weather ingestion

use axum::{
    extract::{Path, State},
    Json,
};

use shared::{validate_coordinates, UserId, WeatherSnapshot};

use crate::error::{AppError, AppResult};
use crate::services::weather::{IngestOutcome, WeatherService};
use crate::AppState;

/// Accept a snapshot for a user's location and raise any alerts
pub async fn ingest_snapshot(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(snapshot): Json<WeatherSnapshot>,
) -> AppResult<Json<IngestOutcome>> {
    if let Some(location) = &snapshot.location {
        validate_coordinates(location).map_err(|msg| AppError::Validation {
            field: "location".to_string(),
            message: msg.to_string(),
        })?;
    }
    if !(0..=100).contains(&snapshot.humidity_percent) {
        return Err(AppError::Validation {
            field: "humidity_percent".to_string(),
            message: "Humidity must be between 0 and 100".to_string(),
        });
    }

    let service = WeatherService::new(
        state.db,
        state.hub,
        state.config.alerts.clone(),
        state.config.realtime.dedup_window(),
    );
    let outcome = service.ingest_snapshot(UserId(user_id), snapshot).await?;
    Ok(Json(outcome))
}
