//! HTTP handlers for notification log endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use shared::{ClearAllResponse, MarkAllReadResponse, NotificationRecord, UserId};

use crate::error::AppResult;
use crate::services::NotificationService;
use crate::AppState;

/// Query parameters for listing notifications
#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub unread_only: Option<bool>,
}

/// Get a user's notifications, newest first
pub async fn get_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<ListNotificationsQuery>,
) -> AppResult<Json<Vec<NotificationRecord>>> {
    let service = NotificationService::new(state.db);
    let notifications = service
        .list(UserId(user_id), query.unread_only.unwrap_or(false))
        .await?;
    Ok(Json(notifications))
}

/// Mark all notifications as read
pub async fn mark_all_as_read(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<MarkAllReadResponse>> {
    let service = NotificationService::new(state.db);
    let count = service.mark_all_read(UserId(user_id)).await?;
    Ok(Json(MarkAllReadResponse { marked_count: count }))
}

/// Delete all notifications
pub async fn clear_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ClearAllResponse>> {
    let service = NotificationService::new(state.db);
    let count = service.clear_all(UserId(user_id)).await?;
    Ok(Json(ClearAllResponse {
        cleared_count: count,
    }))
}
