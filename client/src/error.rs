//! Error handling for the Pocket Farm garden client

use thiserror::Error;

use shared::ScheduleError;

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    // Collaborator errors
    #[error("{service} service unreachable: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} service returned {status}: {message}")]
    Service {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),

    // Store errors
    #[error("Crop not found in schedule: {0}")]
    UnknownCrop(String),

    #[error("A watering update for {0} is already in flight")]
    ToggleInFlight(String),

    #[error("Watering status store has shut down")]
    StoreClosed,

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    // Channel errors
    #[error("Notification channel error: {0}")]
    Channel(String),

    #[error("Malformed message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),
}

impl ClientError {
    /// Whether retrying the same operation later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport { .. } | ClientError::Channel(_) => true,
            ClientError::Service { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
