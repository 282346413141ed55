//! Data models
//!
//! Typed records for foods, ingredients, recipes and conversions.

mod conversion;
mod food;
mod ingredient;
mod nutrition;
mod recipe;

pub use conversion::{ConversionTable, FoodPortion};
pub use food::{FoodRecord, FoodSummary};
pub use ingredient::{Ingredient, IngredientRecord, IngredientSource};
pub use nutrition::{Nutrient, NutrientProfile, NutrientUnit};
pub use recipe::{FinalDish, FinalDishDraft, SubRecipe, SubRecipeDraft, YieldInfo};
