//! Configuration for the Pocket Farm garden client
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/client-development.toml, ...)
//! 3. Environment variable overrides with PFC_ prefix

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main client configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Current environment (development, production)
    pub environment: String,

    /// Collaborating service endpoints
    pub services: ServicesConfig,

    /// Real-time notification channel
    pub realtime: RealtimeConfig,

    /// Companion crop resolution
    pub companions: CompanionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    /// Schedule service base URL
    pub schedule_url: String,

    /// Notification service base URL
    pub notification_url: String,

    /// Garden inventory service base URL
    pub inventory_url: String,

    /// Crop reference service base URL
    pub crop_reference_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RealtimeConfig {
    /// WebSocket endpoint, e.g. ws://localhost:3000/api/v1/realtime
    pub url: String,

    /// Connection attempts before the channel gives up
    pub max_reconnect_attempts: u32,

    /// First reconnect delay in milliseconds
    pub reconnect_base_delay_ms: u64,

    /// Upper bound for reconnect delays in milliseconds
    pub reconnect_max_delay_ms: u64,

    /// Keep-alive ping interval in seconds
    pub ping_interval_secs: u64,

    /// Window in which a repeated alert is suppressed
    pub dedup_window_secs: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompanionConfig {
    /// Maximum companion details resolved per crop
    pub max_companions: usize,
}

impl ClientConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("PFC_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("services.schedule_url", "http://localhost:3000/api/v1")?
            .set_default("services.notification_url", "http://localhost:3000/api/v1")?
            .set_default("services.inventory_url", "http://localhost:5000")?
            .set_default("services.crop_reference_url", "http://localhost:5000")?
            .set_default("services.request_timeout_secs", 10)?
            .set_default("realtime.url", "ws://localhost:3000/api/v1/realtime")?
            .set_default("realtime.max_reconnect_attempts", 5)?
            .set_default("realtime.reconnect_base_delay_ms", 1000)?
            .set_default("realtime.reconnect_max_delay_ms", 5000)?
            .set_default("realtime.ping_interval_secs", 25)?
            .set_default("realtime.dedup_window_secs", 1800)?
            .set_default("companions.max_companions", 2)?
            // Load environment-specific config file
            .add_source(
                File::with_name(&format!("config/client-{}", environment)).required(false),
            )
            // Override with environment variables (PFC_ prefix)
            .add_source(
                Environment::with_prefix("PFC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl RealtimeConfig {
    /// Delay before reconnect attempt `attempt` (1-based)
    ///
    /// Doubles from the base delay and is capped at the maximum.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .reconnect_base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.reconnect_max_delay_ms);
        Duration::from_millis(delay)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }

    pub fn dedup_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.dedup_window_secs.max(0))
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:3000/api/v1/realtime".to_string(),
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 5000,
            ping_interval_secs: 25,
            dedup_window_secs: 1800,
        }
    }
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self { max_companions: 2 }
    }
}
