//! Food database records
//!
//! What the ingredient store hands back: per-100 g nutrients plus any
//! household portion data.

use serde::{Deserialize, Serialize};

use super::{FoodPortion, Nutrient, NutrientProfile};

/// A search hit from the food database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodSummary {
    pub fdc_id: i64,
    pub description: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub brand_owner: Option<String>,
}

/// Full nutrient data for one food
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub fdc_id: i64,
    pub description: String,
    #[serde(default)]
    pub data_type: Option<String>,
    /// Per 100 g
    pub profile: NutrientProfile,
    #[serde(default)]
    pub portions: Vec<FoodPortion>,
    /// Required nutrients the source did not report (zero-filled in `profile`)
    #[serde(default)]
    pub missing: Vec<Nutrient>,
}

impl FoodRecord {
    pub fn new(fdc_id: i64, description: impl Into<String>, profile: NutrientProfile) -> Self {
        Self {
            fdc_id,
            description: description.into(),
            data_type: None,
            profile,
            portions: Vec::new(),
            missing: Vec::new(),
        }
    }

    pub fn with_portion(mut self, portion: FoodPortion) -> Self {
        self.portions.push(portion);
        self
    }
}
