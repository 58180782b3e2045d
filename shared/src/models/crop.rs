//! Crop reference models

use serde::{Deserialize, Serialize};

/// Full reference detail for a crop, as served by the crop reference service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropDetail {
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub growing_conditions: Option<String>,
    #[serde(default)]
    pub care_instructions: Option<String>,
    #[serde(default)]
    pub water_needs: Option<String>,
    #[serde(default)]
    pub sunlight: Option<String>,
    /// Names of crops that grow well alongside this one
    #[serde(default)]
    pub companion_crops: Vec<String>,
}

impl CropDetail {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_url: None,
            scientific_name: None,
            description: None,
            growing_conditions: None,
            care_instructions: None,
            water_needs: None,
            sunlight: None,
            companion_crops: Vec::new(),
        }
    }
}
