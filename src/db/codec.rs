//! Stored record codec
//!
//! The one place recipe JSON is read or written. Decoding re-checks every
//! invariant a typed record carries: each ingredient references exactly one
//! of a food or a sub-recipe, quantities are positive, yield weights are
//! positive and the percentage agrees with them. Anything else is a
//! [`ValidationError::MalformedRecord`].

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::{FinalDish, Ingredient, IngredientRecord, NutrientProfile, SubRecipe, YieldInfo};

/// One row of `sub_recipes` or `final_dishes`
#[derive(Debug, Clone)]
pub struct RecordRow {
    pub id: String,
    pub name: String,
    pub data: String,
    pub created_at: String,
    pub updated_at: String,
}

impl RecordRow {
    /// Columns in `SELECT id, name, data, created_at, updated_at` order
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            data: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct SubRecipeData {
    ingredients: Vec<IngredientRecord>,
    yield_info: YieldInfo,
    nutrient_profile: NutrientProfile,
    serving_size_grams: f64,
}

#[derive(Serialize, Deserialize)]
struct FinalDishData {
    ingredients: Vec<IngredientRecord>,
    yield_info: YieldInfo,
    nutrient_profile: NutrientProfile,
    serving_size_grams: f64,
    servings_per_container: f64,
    #[serde(default)]
    allergens: Vec<String>,
    #[serde(default)]
    notes: Option<String>,
}

fn malformed(id: &str, what: impl std::fmt::Display) -> ValidationError {
    ValidationError::MalformedRecord(format!("{}: {}", id, what))
}

pub fn encode_sub_recipe(sub_recipe: &SubRecipe) -> Result<String, ValidationError> {
    let data = SubRecipeData {
        ingredients: sub_recipe.ingredients.iter().map(IngredientRecord::from).collect(),
        yield_info: sub_recipe.yield_info.clone(),
        nutrient_profile: sub_recipe.nutrient_profile,
        serving_size_grams: sub_recipe.serving_size_grams,
    };
    serde_json::to_string(&data).map_err(|e| malformed(&sub_recipe.id, e))
}

pub fn decode_sub_recipe(row: RecordRow) -> Result<SubRecipe, ValidationError> {
    let data: SubRecipeData = serde_json::from_str(&row.data).map_err(|e| malformed(&row.id, e))?;
    let ingredients = decode_ingredients(&row.id, data.ingredients)?;
    let yield_info = data.yield_info.revalidated().map_err(|e| malformed(&row.id, e))?;
    check_profile(&row.id, &data.nutrient_profile)?;
    check_positive(&row.id, "serving size", data.serving_size_grams)?;

    Ok(SubRecipe {
        id: row.id,
        name: row.name,
        ingredients,
        yield_info,
        nutrient_profile: data.nutrient_profile,
        serving_size_grams: data.serving_size_grams,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

pub fn encode_final_dish(dish: &FinalDish) -> Result<String, ValidationError> {
    let data = FinalDishData {
        ingredients: dish.ingredients.iter().map(IngredientRecord::from).collect(),
        yield_info: dish.yield_info.clone(),
        nutrient_profile: dish.nutrient_profile,
        serving_size_grams: dish.serving_size_grams,
        servings_per_container: dish.servings_per_container,
        allergens: dish.allergens.clone(),
        notes: dish.notes.clone(),
    };
    serde_json::to_string(&data).map_err(|e| malformed(&dish.id, e))
}

pub fn decode_final_dish(row: RecordRow) -> Result<FinalDish, ValidationError> {
    let data: FinalDishData = serde_json::from_str(&row.data).map_err(|e| malformed(&row.id, e))?;
    let ingredients = decode_ingredients(&row.id, data.ingredients)?;
    let yield_info = data.yield_info.revalidated().map_err(|e| malformed(&row.id, e))?;
    check_profile(&row.id, &data.nutrient_profile)?;
    check_positive(&row.id, "serving size", data.serving_size_grams)?;
    check_positive(&row.id, "servings per container", data.servings_per_container)?;

    Ok(FinalDish {
        id: row.id,
        name: row.name,
        ingredients,
        yield_info,
        nutrient_profile: data.nutrient_profile,
        serving_size_grams: data.serving_size_grams,
        servings_per_container: data.servings_per_container,
        allergens: data.allergens,
        notes: data.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn decode_ingredients(id: &str, records: Vec<IngredientRecord>) -> Result<Vec<Ingredient>, ValidationError> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            let ingredient = Ingredient::try_from(record).map_err(|e| malformed(id, format!("ingredient {}: {}", i + 1, e)))?;
            ingredient
                .validate_quantity()
                .map_err(|e| malformed(id, format!("ingredient {}: {}", i + 1, e)))?;
            Ok(ingredient)
        })
        .collect()
}

fn check_profile(id: &str, profile: &NutrientProfile) -> Result<(), ValidationError> {
    if profile.is_valid() {
        Ok(())
    } else {
        Err(malformed(id, "nutrient profile has negative or non-finite values"))
    }
}

fn check_positive(id: &str, field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(malformed(id, format!("{} must be positive (got {})", field, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sub_recipe() -> SubRecipe {
        let mut profile = NutrientProfile::zero();
        profile.calories = 120.0;
        SubRecipe {
            id: "sr_1".into(),
            name: "Salsa".into(),
            ingredients: vec![
                Ingredient::food("tomato", 170457, 2.0, "each"),
                Ingredient::sub_recipe("chili paste", "sr_0", 1.0, "tbsp").with_conversion("tbsp", 18.0),
            ],
            yield_info: YieldInfo::new(400.0, 380.0, None).unwrap(),
            nutrient_profile: profile,
            serving_size_grams: 30.0,
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    fn row(id: &str, data: &str) -> RecordRow {
        RecordRow {
            id: id.into(),
            name: "x".into(),
            data: data.into(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_sub_recipe_survives_storage() {
        let original = sample_sub_recipe();
        let data = encode_sub_recipe(&original).unwrap();
        assert!(data.contains("\"fdc_id\":170457"));
        assert!(data.contains("\"sub_recipe_id\":\"sr_0\""));

        let decoded = decode_sub_recipe(RecordRow {
            id: original.id.clone(),
            name: original.name.clone(),
            data,
            created_at: original.created_at.clone(),
            updated_at: original.updated_at.clone(),
        })
        .unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_ingredient_with_both_references_is_malformed() {
        let data = r#"{
            "ingredients": [{"name": "mystery", "quantity": 1.0, "unit": "g", "fdc_id": 1, "sub_recipe_id": "sr_2"}],
            "yield_info": {"raw_total_weight_grams": 100.0, "final_cooked_weight_grams": 90.0, "yield_percentage": 90.0},
            "nutrient_profile": {},
            "serving_size_grams": 30.0
        }"#;
        let err = decode_sub_recipe(row("sr_9", data)).unwrap_err();
        match err {
            ValidationError::MalformedRecord(message) => {
                assert!(message.starts_with("sr_9"));
                assert!(message.contains("mystery"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_bad_yield_and_garbage_are_malformed() {
        let zero_weight = r#"{
            "ingredients": [],
            "yield_info": {"raw_total_weight_grams": 100.0, "final_cooked_weight_grams": 0.0, "yield_percentage": 0.0},
            "nutrient_profile": {},
            "serving_size_grams": 30.0,
            "servings_per_container": 2.0
        }"#;
        assert!(matches!(
            decode_final_dish(row("fd_1", zero_weight)),
            Err(ValidationError::MalformedRecord(_))
        ));
        assert!(matches!(
            decode_final_dish(row("fd_2", "not json")),
            Err(ValidationError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_stale_yield_percentage_is_recomputed() {
        let data = r#"{
            "ingredients": [{"name": "rice", "quantity": 1.0, "unit": "cup", "fdc_id": 5}],
            "yield_info": {"raw_total_weight_grams": 200.0, "final_cooked_weight_grams": 500.0, "yield_percentage": 10.0},
            "nutrient_profile": {"calories": 130.0},
            "serving_size_grams": 150.0,
            "servings_per_container": 3.0
        }"#;
        let dish = decode_final_dish(row("fd_3", data)).unwrap();
        assert!((dish.yield_info.yield_percentage() - 250.0).abs() < 1e-9);
        assert!(dish.allergens.is_empty());
    }
}
