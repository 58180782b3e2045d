//! Garden add/remove flow
//!
//! The inventory service owns which crops are in a garden. Schedule creation
//! and deletion run alongside it on a best-effort basis; a garden crop without
//! a schedule is a tolerated state.

use std::sync::Arc;

use tracing::{info, warn};

use shared::{validate_crop_name, CropDetail, CropScheduleRecord, UserId};

use crate::api::{GardenInventoryApi, ScheduleApi};
use crate::companion::CompanionResolver;
use crate::error::{ClientError, ClientResult};
use crate::store::ScheduleInvalidator;

/// Whether a schedule exists for a newly added crop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleProvision {
    Created(CropScheduleRecord),
    Unavailable { reason: String },
}

/// Result of adding a crop to the garden
#[derive(Debug, Clone)]
pub struct AddCropOutcome {
    /// Garden crop names after the add
    pub crops: Vec<String>,
    pub schedule: ScheduleProvision,
    /// Resolved companion details; empty when none could be resolved
    pub companions: Vec<CropDetail>,
}

/// Garden mutations for one signed-in user
pub struct GardenActions {
    user_id: UserId,
    inventory: Arc<dyn GardenInventoryApi>,
    schedules: Arc<dyn ScheduleApi>,
    companions: Arc<CompanionResolver>,
    invalidator: ScheduleInvalidator,
}

impl GardenActions {
    pub fn new(
        user_id: UserId,
        inventory: Arc<dyn GardenInventoryApi>,
        schedules: Arc<dyn ScheduleApi>,
        companions: Arc<CompanionResolver>,
        invalidator: ScheduleInvalidator,
    ) -> Self {
        Self {
            user_id,
            inventory,
            schedules,
            companions,
            invalidator,
        }
    }

    pub async fn crops(&self) -> ClientResult<Vec<String>> {
        self.inventory.garden_crops(self.user_id).await
    }

    /// Add a crop, create its schedule, then resolve its companions
    ///
    /// Only the inventory add can fail the operation.
    pub async fn add_crop(&self, crop_name: &str) -> ClientResult<AddCropOutcome> {
        let crop_name = crop_name.trim();
        validate_crop_name(crop_name).map_err(|e| ClientError::InvalidInput(e.to_string()))?;

        let crops = self.inventory.add_crop(self.user_id, crop_name).await?;
        info!(user_id = %self.user_id, crop_name, "Added crop to garden");

        let schedule = match self.schedules.create_schedule(self.user_id, crop_name).await {
            Ok(record) => ScheduleProvision::Created(record),
            Err(e) => {
                warn!(user_id = %self.user_id, crop_name, error = %e, "Schedule creation failed");
                ScheduleProvision::Unavailable {
                    reason: e.to_string(),
                }
            }
        };
        self.invalidator.invalidate();

        let companions = match self.companions.crop_detail(crop_name).await {
            Ok(detail) => self.companions.resolve_companions(&detail).await,
            Err(e) => {
                warn!(crop_name, error = %e, "Crop detail lookup failed, skipping companions");
                Vec::new()
            }
        };

        Ok(AddCropOutcome {
            crops,
            schedule,
            companions,
        })
    }

    /// Remove a crop and its schedule
    pub async fn remove_crop(&self, crop_name: &str) -> ClientResult<Vec<String>> {
        let crops = self.inventory.remove_crop(self.user_id, crop_name).await?;
        info!(user_id = %self.user_id, crop_name, "Removed crop from garden");

        if let Err(e) = self.schedules.delete_schedule(self.user_id, crop_name).await {
            warn!(user_id = %self.user_id, crop_name, error = %e, "Schedule deletion failed");
        }
        self.invalidator.invalidate();

        Ok(crops)
    }
}
