//! HTTP handlers for watering schedule endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Local;

use shared::{CropScheduleRecord, ServerEvent, UserId};

use crate::error::AppResult;
use crate::services::schedule::{CreateScheduleInput, ScheduleService, WateringInput};
use crate::AppState;

fn schedule_changed(state: &AppState, user_id: UserId, crop_name: &str) {
    state.hub.publish(
        user_id,
        ServerEvent::ScheduleChanged {
            crop_names: vec![crop_name.to_string()],
        },
    );
}

/// List a user's schedules
pub async fn list_schedules(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<CropScheduleRecord>>> {
    let service = ScheduleService::new(state.db);
    let records = service
        .list(UserId(user_id), Local::now().date_naive())
        .await?;
    Ok(Json(records))
}

/// Create a schedule for a crop added to a garden
pub async fn create_schedule(
    State(state): State<AppState>,
    Json(input): Json<CreateScheduleInput>,
) -> AppResult<(StatusCode, Json<CropScheduleRecord>)> {
    let user_id = input.user_id;
    let service = ScheduleService::new(state.db.clone());
    let record = service.create(input, Local::now().date_naive()).await?;
    schedule_changed(&state, user_id, &record.crop_name);
    Ok((StatusCode::CREATED, Json(record)))
}

/// Set the watered flag of a schedule to an explicit value
pub async fn update_watering(
    State(state): State<AppState>,
    Path((user_id, crop_name)): Path<(i64, String)>,
    Json(input): Json<WateringInput>,
) -> AppResult<Json<CropScheduleRecord>> {
    let user_id = UserId(user_id);
    let service = ScheduleService::new(state.db.clone());
    let record = service
        .update_watering(user_id, &crop_name, input.watered, Local::now().date_naive())
        .await?;
    schedule_changed(&state, user_id, &crop_name);
    Ok(Json(record))
}

/// Delete a schedule
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path((user_id, crop_name)): Path<(i64, String)>,
) -> AppResult<StatusCode> {
    let user_id = UserId(user_id);
    let service = ScheduleService::new(state.db.clone());
    service.delete(user_id, &crop_name).await?;
    schedule_changed(&state, user_id, &crop_name);
    Ok(StatusCode::NO_CONTENT)
}
