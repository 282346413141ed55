//! Recipe models
//!
//! Sub-recipes (reusable components) and final dishes (labelable output).
//! Both own their ingredient list and carry yield metadata plus the
//! computed per-100 g profile.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use super::{Ingredient, NutrientProfile};

/// Raw vs. cooked weight of a recipe
///
/// Fields are private so `yield_percentage` cannot drift from the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldInfo {
    raw_total_weight_grams: f64,
    final_cooked_weight_grams: f64,
    yield_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cooking_method: Option<String>,
}

impl YieldInfo {
    pub fn new(
        raw_total_weight_grams: f64,
        final_cooked_weight_grams: f64,
        cooking_method: Option<String>,
    ) -> Result<Self, ValidationError> {
        validate_final_weight(final_cooked_weight_grams)?;
        validate_raw_weight(raw_total_weight_grams)?;
        Ok(Self {
            raw_total_weight_grams,
            final_cooked_weight_grams,
            yield_percentage: final_cooked_weight_grams / raw_total_weight_grams * 100.0,
            cooking_method,
        })
    }

    pub fn raw_total_weight_grams(&self) -> f64 {
        self.raw_total_weight_grams
    }

    pub fn final_cooked_weight_grams(&self) -> f64 {
        self.final_cooked_weight_grams
    }

    pub fn yield_percentage(&self) -> f64 {
        self.yield_percentage
    }

    pub fn cooking_method(&self) -> Option<&str> {
        self.cooking_method.as_deref()
    }

    pub fn set_raw_weight(&mut self, grams: f64) -> Result<(), ValidationError> {
        validate_raw_weight(grams)?;
        self.raw_total_weight_grams = grams;
        self.recompute();
        Ok(())
    }

    pub fn set_final_weight(&mut self, grams: f64) -> Result<(), ValidationError> {
        validate_final_weight(grams)?;
        self.final_cooked_weight_grams = grams;
        self.recompute();
        Ok(())
    }

    /// Re-check invariants after deserialization and recompute the percentage
    pub fn revalidated(self) -> Result<Self, ValidationError> {
        YieldInfo::new(
            self.raw_total_weight_grams,
            self.final_cooked_weight_grams,
            self.cooking_method,
        )
    }

    fn recompute(&mut self) {
        self.yield_percentage = self.final_cooked_weight_grams / self.raw_total_weight_grams * 100.0;
    }
}

fn validate_final_weight(grams: f64) -> Result<(), ValidationError> {
    if grams.is_finite() && grams > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidFinalWeight(grams))
    }
}

fn validate_raw_weight(grams: f64) -> Result<(), ValidationError> {
    if grams.is_finite() && grams > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidRawWeight(grams))
    }
}

/// A reusable component recipe (a sauce, a dough)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubRecipe {
    pub id: String,
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub yield_info: YieldInfo,
    /// Per 100 g of final cooked weight
    pub nutrient_profile: NutrientProfile,
    pub serving_size_grams: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl SubRecipe {
    pub fn references(&self, sub_recipe_id: &str) -> bool {
        self.ingredients
            .iter()
            .any(|i| i.sub_recipe_id() == Some(sub_recipe_id))
    }
}

/// The terminal, labelable recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDish {
    pub id: String,
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub yield_info: YieldInfo,
    /// Per 100 g of final cooked weight
    pub nutrient_profile: NutrientProfile,
    pub serving_size_grams: f64,
    pub servings_per_container: f64,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FinalDish {
    pub fn references(&self, sub_recipe_id: &str) -> bool {
        self.ingredients
            .iter()
            .any(|i| i.sub_recipe_id() == Some(sub_recipe_id))
    }
}

/// A sub-recipe that has not been saved yet
///
/// `key` is a caller-chosen placeholder; dish ingredients may reference it as
/// their `sub_recipe_id` and are rewritten to the real id on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubRecipeDraft {
    pub key: String,
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub final_cooked_weight_grams: f64,
    /// Defaults to the whole batch when unset
    #[serde(default)]
    pub serving_size_grams: Option<f64>,
    #[serde(default)]
    pub cooking_method: Option<String>,
}

/// A final dish that has not been saved yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDishDraft {
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub final_cooked_weight_grams: f64,
    pub serving_size_grams: f64,
    #[serde(default)]
    pub servings_per_container: Option<f64>,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub cooking_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}
