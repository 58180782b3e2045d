//! Pocket Farm - schedule and notification server
//!
//! Keeps per-user crop care schedules, the notification log and the
//! real-time rooms that push weather alerts and care reminders to gardeners.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod realtime;
pub mod routes;
pub mod services;

pub use config::Config;
pub use realtime::RoomHub;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub hub: RoomHub,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: Config) -> Self {
        let hub = RoomHub::new(config.realtime.room_capacity);
        Self {
            db,
            config: Arc::new(config),
            hub,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Pocket Farm API v1.0"
}
