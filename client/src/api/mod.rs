//! Collaborator service contracts
//!
//! The store, channel and garden flows depend on these traits rather than on
//! HTTP directly, so tests can substitute in-memory implementations.

mod http;

pub use http::HttpServiceClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use shared::{CropDetail, CropScheduleRecord, NotificationRecord, UserId};

use crate::error::ClientResult;

/// Schedule service: authoritative per-user crop schedules
#[async_trait]
pub trait ScheduleApi: Send + Sync {
    async fn list_schedules(&self, user_id: UserId) -> ClientResult<Vec<CropScheduleRecord>>;

    /// Set the watered flag for the crop's current cycle to `watered`
    async fn update_watering(
        &self,
        user_id: UserId,
        crop_name: &str,
        watered: bool,
    ) -> ClientResult<CropScheduleRecord>;

    async fn create_schedule(
        &self,
        user_id: UserId,
        crop_name: &str,
    ) -> ClientResult<CropScheduleRecord>;

    async fn delete_schedule(&self, user_id: UserId, crop_name: &str) -> ClientResult<()>;
}

/// Notification service: persisted notification log
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn list_notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
    ) -> ClientResult<Vec<NotificationRecord>>;

    /// Returns the number of notifications marked read
    async fn mark_all_read(&self, user_id: UserId) -> ClientResult<u64>;

    /// Returns the number of notifications removed
    async fn clear_all(&self, user_id: UserId) -> ClientResult<u64>;
}

/// Garden inventory service: the set of crops in a user's garden
#[async_trait]
pub trait GardenInventoryApi: Send + Sync {
    async fn garden_crops(&self, user_id: UserId) -> ClientResult<Vec<String>>;

    /// Add a crop; returns the garden's crop names afterwards
    async fn add_crop(&self, user_id: UserId, crop_name: &str) -> ClientResult<Vec<String>>;

    /// Remove a crop; returns the garden's crop names afterwards
    async fn remove_crop(&self, user_id: UserId, crop_name: &str) -> ClientResult<Vec<String>>;
}

/// Crop reference service: descriptive crop details by exact name
#[async_trait]
pub trait CropReferenceApi: Send + Sync {
    async fn crop_detail(&self, crop_name: &str) -> ClientResult<CropDetail>;
}

/// Request body for adding a crop to a garden
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCropRequest {
    pub crop_name: String,
}

/// Inventory response: the garden's current crop names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GardenCrops {
    pub crops: Vec<String>,
}
