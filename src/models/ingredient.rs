//! Ingredient model
//!
//! A single recipe line: quantity, unit, and a reference to either a food
//! database entry or a sub-recipe.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use super::ConversionTable;

/// What an ingredient line points at
///
/// An enum rather than two optional ids, so "both" and "neither" cannot be
/// represented once a line has been decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngredientSource {
    /// FoodData Central entry
    Food { fdc_id: i64 },
    /// Stored sub-recipe
    SubRecipe { sub_recipe_id: String },
}

impl IngredientSource {
    /// Human-readable reference, used in error messages
    pub fn describe(&self) -> String {
        match self {
            IngredientSource::Food { fdc_id } => format!("food #{}", fdc_id),
            IngredientSource::SubRecipe { sub_recipe_id } => format!("sub-recipe {}", sub_recipe_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub source: IngredientSource,
    #[serde(default, skip_serializing_if = "ConversionTable::is_empty")]
    pub custom_conversions: ConversionTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Ingredient {
    pub fn food(name: impl Into<String>, fdc_id: i64, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
            source: IngredientSource::Food { fdc_id },
            custom_conversions: ConversionTable::new(),
            notes: None,
        }
    }

    pub fn sub_recipe(
        name: impl Into<String>,
        sub_recipe_id: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
            source: IngredientSource::SubRecipe {
                sub_recipe_id: sub_recipe_id.into(),
            },
            custom_conversions: ConversionTable::new(),
            notes: None,
        }
    }

    /// Attach a custom unit conversion for this line's food
    pub fn with_conversion(mut self, unit: impl Into<String>, grams_per_unit: f64) -> Self {
        self.custom_conversions.insert(unit, grams_per_unit);
        self
    }

    pub fn sub_recipe_id(&self) -> Option<&str> {
        match &self.source {
            IngredientSource::SubRecipe { sub_recipe_id } => Some(sub_recipe_id),
            IngredientSource::Food { .. } => None,
        }
    }

    /// Reject zero, negative and non-finite quantities
    pub fn validate_quantity(&self) -> Result<(), ValidationError> {
        if self.quantity.is_finite() && self.quantity > 0.0 {
            Ok(())
        } else {
            Err(ValidationError::InvalidQuantity {
                ingredient: self.name.clone(),
                quantity: self.quantity,
            })
        }
    }
}

/// Flat, two-optional-id form of an ingredient used at serialization boundaries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fdc_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_recipe_id: Option<String>,
    #[serde(default, skip_serializing_if = "ConversionTable::is_empty")]
    pub custom_conversions: ConversionTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TryFrom<IngredientRecord> for Ingredient {
    type Error = ValidationError;

    fn try_from(record: IngredientRecord) -> Result<Self, Self::Error> {
        let source = match (record.fdc_id, record.sub_recipe_id) {
            (Some(fdc_id), None) => IngredientSource::Food { fdc_id },
            (None, Some(id)) if !id.trim().is_empty() => IngredientSource::SubRecipe {
                sub_recipe_id: id.trim().to_string(),
            },
            _ => return Err(ValidationError::AmbiguousReference(record.name)),
        };

        Ok(Ingredient {
            name: record.name,
            quantity: record.quantity,
            unit: record.unit,
            source,
            custom_conversions: record.custom_conversions,
            notes: record.notes,
        })
    }
}

impl From<&Ingredient> for IngredientRecord {
    fn from(ingredient: &Ingredient) -> Self {
        let (fdc_id, sub_recipe_id) = match &ingredient.source {
            IngredientSource::Food { fdc_id } => (Some(*fdc_id), None),
            IngredientSource::SubRecipe { sub_recipe_id } => (None, Some(sub_recipe_id.clone())),
        };
        Self {
            name: ingredient.name.clone(),
            quantity: ingredient.quantity,
            unit: ingredient.unit.clone(),
            fdc_id,
            sub_recipe_id,
            custom_conversions: ingredient.custom_conversions.clone(),
            notes: ingredient.notes.clone(),
        }
    }
}
