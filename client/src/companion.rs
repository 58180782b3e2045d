//! Companion crop resolution
//!
//! After a crop joins the garden, its companion names are looked up in the
//! crop reference service so the view can suggest what to plant alongside.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tracing::{debug, warn};

use shared::CropDetail;

use crate::api::CropReferenceApi;
use crate::error::ClientResult;

/// Resolves and caches crop details for the session
pub struct CompanionResolver {
    api: Arc<dyn CropReferenceApi>,
    max_companions: usize,
    cache: Mutex<HashMap<String, CropDetail>>,
}

impl CompanionResolver {
    pub fn new(api: Arc<dyn CropReferenceApi>, max_companions: usize) -> Self {
        Self {
            api,
            max_companions,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, crop_name: &str) -> Option<CropDetail> {
        match self.cache.lock() {
            Ok(cache) => cache.get(crop_name).cloned(),
            Err(poisoned) => poisoned.into_inner().get(crop_name).cloned(),
        }
    }

    fn remember(&self, detail: &CropDetail) {
        let mut cache = match self.cache.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.insert(detail.name.clone(), detail.clone());
    }

    /// Crop detail by exact name, served from cache when known
    pub async fn crop_detail(&self, crop_name: &str) -> ClientResult<CropDetail> {
        if let Some(detail) = self.cached(crop_name) {
            debug!(crop_name, "Crop detail cache hit");
            return Ok(detail);
        }

        let detail = self.api.crop_detail(crop_name).await?;
        self.remember(&detail);
        Ok(detail)
    }

    /// Resolve up to `max_companions` companions of `crop` concurrently
    ///
    /// Lookups that fail are logged and left out. The result keeps the order
    /// of the crop's companion list.
    pub async fn resolve_companions(&self, crop: &CropDetail) -> Vec<CropDetail> {
        let names = companion_names(crop, self.max_companions);
        let lookups = names.iter().map(|name| self.crop_detail(name));
        let outcomes = join_all(lookups).await;

        names
            .iter()
            .zip(outcomes)
            .filter_map(|(name, outcome)| match outcome {
                Ok(detail) => Some(detail),
                Err(e) => {
                    warn!(crop_name = %crop.name, companion = %name, error = %e, "Companion lookup failed");
                    None
                }
            })
            .collect()
    }

    pub fn clear(&self) {
        match self.cache.lock() {
            Ok(mut cache) => cache.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

/// Companion names worth looking up, in list order
///
/// Trims whitespace and skips blanks, repeats and the crop itself.
pub fn companion_names(crop: &CropDetail, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    crop.companion_crops
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty() && *name != crop.name.trim())
        .filter(|name| seen.insert(name.to_string()))
        .take(limit)
        .map(str::to_string)
        .collect()
}
