//! Route definitions for the Pocket Farm server

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, realtime, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Schedule management
        .nest("/schedules", schedule_routes())
        // Notification log
        .nest("/notifications", notification_routes())
        // Weather ingestion
        .nest("/weather", weather_routes())
        // Real-time channel
        .route("/realtime", get(realtime::realtime_socket))
}

/// Watering schedule routes
fn schedule_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_schedule))
        .route("/:user_id", get(handlers::list_schedules))
        .route("/:user_id/:crop_name", delete(handlers::delete_schedule))
        .route(
            "/:user_id/:crop_name/watering",
            post(handlers::update_watering),
        )
}

/// Notification routes
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:user_id",
            get(handlers::get_notifications).delete(handlers::clear_notifications),
        )
        .route("/:user_id/read", post(handlers::mark_all_as_read))
}

/// Weather routes
fn weather_routes() -> Router<AppState> {
    Router::new().route("/:user_id/snapshot", post(handlers::ingest_snapshot))
}
