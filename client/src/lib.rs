//! Pocket Farm garden client
//!
//! Client-side state for a signed-in gardener:
//! - `store`: the shared watering status store with optimistic toggles
//! - `channel`: the real-time notification channel and its log
//! - `companion`: companion crop resolution
//! - `garden`: the add/remove crop flow
//! - `session`: wiring for one signed-in user

pub mod api;
pub mod channel;
pub mod companion;
pub mod config;
pub mod error;
pub mod garden;
pub mod session;
pub mod store;

pub use channel::{ChannelEvent, ChannelState, NotificationChannel, WsTransport};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use session::{GardenSession, Services};
pub use store::{ScheduleSnapshot, StoreFeedback, WateringStatusStore};
