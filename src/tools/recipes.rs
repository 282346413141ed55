//! Recipe tools
//!
//! Calculate, save, inspect, delete and recalculate sub-recipes and final
//! dishes. Saving a dish together with new sub-recipes is one logical
//! transaction: every record written before a failure is deleted again.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{CalcError, CalcResult, DataQualityWarning, SaveError, ValidationError};
use crate::models::{FinalDish, FinalDishDraft, Ingredient, IngredientSource, SubRecipe, SubRecipeDraft};
use crate::nutrition::{CalculationResult, RecipeCalculator};
use crate::store::RecipeStore;

/// A dish plus any sub-recipes it introduces, saved together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRecipeRequest {
    /// Saved in order; later drafts and the dish may reference earlier draft keys
    #[serde(default)]
    pub sub_recipes: Vec<SubRecipeDraft>,
    pub dish: FinalDishDraft,
}

/// Response for save_recipe
#[derive(Debug, Serialize)]
pub struct SaveRecipeResponse {
    pub dish: FinalDish,
    pub sub_recipes: Vec<SubRecipe>,
    pub warnings: Vec<DataQualityWarning>,
}

/// Sub-recipe summary for listing
#[derive(Debug, Serialize)]
pub struct SubRecipeSummary {
    pub id: String,
    pub name: String,
    pub ingredient_count: usize,
    pub final_cooked_weight_grams: f64,
    pub calories_per_100g: f64,
    pub updated_at: String,
}

impl From<&SubRecipe> for SubRecipeSummary {
    fn from(s: &SubRecipe) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            ingredient_count: s.ingredients.len(),
            final_cooked_weight_grams: s.yield_info.final_cooked_weight_grams(),
            calories_per_100g: s.nutrient_profile.calories,
            updated_at: s.updated_at.clone(),
        }
    }
}

/// Final dish summary for listing
#[derive(Debug, Serialize)]
pub struct FinalDishSummary {
    pub id: String,
    pub name: String,
    pub ingredient_count: usize,
    pub serving_size_grams: f64,
    pub servings_per_container: f64,
    pub calories_per_serving: f64,
    pub updated_at: String,
}

impl From<&FinalDish> for FinalDishSummary {
    fn from(d: &FinalDish) -> Self {
        Self {
            id: d.id.clone(),
            name: d.name.clone(),
            ingredient_count: d.ingredients.len(),
            serving_size_grams: d.serving_size_grams,
            servings_per_container: d.servings_per_container,
            calories_per_serving: d.nutrient_profile.calories * d.serving_size_grams / 100.0,
            updated_at: d.updated_at.clone(),
        }
    }
}

/// Response for delete_sub_recipe / delete_final_dish
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: String,
    pub deleted: bool,
}

/// Response for recalculate_final_dish
#[derive(Debug, Serialize)]
pub struct RecalculateResponse {
    pub dish: FinalDish,
    pub previous_calories_per_100g: f64,
    pub warnings: Vec<DataQualityWarning>,
}

/// Per-dish outcome of a bulk recalculation
#[derive(Debug, Serialize)]
pub struct RecalculationOutcome {
    pub id: String,
    pub name: String,
    pub previous_calories_per_100g: f64,
    pub calories_per_100g: Option<f64>,
    pub warning_count: usize,
    pub error: Option<String>,
}

/// Calculate a recipe without saving anything
pub async fn calculate(
    calculator: &RecipeCalculator,
    ingredients: &[Ingredient],
    final_cooked_weight_grams: f64,
) -> CalcResult<CalculationResult> {
    calculator.calculate(ingredients, final_cooked_weight_grams).await
}

/// Calculate and store drafted sub-recipes, then the dish
///
/// Records go to the calculator's recipe store, so sub-recipes created
/// earlier in the request resolve for the dish. On failure everything
/// created so far is deleted in reverse order.
pub async fn save_recipe(
    calculator: &RecipeCalculator,
    request: SaveRecipeRequest,
) -> Result<SaveRecipeResponse, SaveError> {
    let store = calculator.resolver().recipes().clone();
    let mut created: Vec<String> = Vec::new();

    match save_steps(calculator, store.as_ref(), request, &mut created).await {
        Ok(response) => Ok(response),
        Err(source) => Err(roll_back(store.as_ref(), source, created).await),
    }
}

async fn save_steps(
    calculator: &RecipeCalculator,
    store: &dyn RecipeStore,
    request: SaveRecipeRequest,
    created: &mut Vec<String>,
) -> CalcResult<SaveRecipeResponse> {
    check_draft_keys(&request.sub_recipes)?;

    let mut ids: HashMap<String, String> = HashMap::new();
    let mut sub_recipes = Vec::new();
    let mut warnings = Vec::new();

    for draft in request.sub_recipes {
        let ingredients = rewrite_draft_refs(draft.ingredients, &ids);
        let result = calculator
            .calculate(&ingredients, draft.final_cooked_weight_grams)
            .await?;
        let serving_size_grams = draft
            .serving_size_grams
            .unwrap_or(draft.final_cooked_weight_grams);
        check_serving_size(serving_size_grams)?;

        let record = SubRecipe {
            id: String::new(),
            name: draft.name.clone(),
            ingredients,
            yield_info: result.yield_info(draft.cooking_method)?,
            nutrient_profile: result.nutrient_profile,
            serving_size_grams,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let saved = store.create_sub_recipe(record).await?;
        created.push(saved.id.clone());
        ids.insert(draft.key.trim().to_string(), saved.id.clone());
        warnings.extend(result.warnings.into_iter().map(|w| w.nested_in(&draft.name)));
        sub_recipes.push(saved);
    }

    let draft = request.dish;
    let ingredients = rewrite_draft_refs(draft.ingredients, &ids);
    let result = calculator
        .calculate(&ingredients, draft.final_cooked_weight_grams)
        .await?;
    check_serving_size(draft.serving_size_grams)?;
    let servings_per_container = draft
        .servings_per_container
        .unwrap_or(draft.final_cooked_weight_grams / draft.serving_size_grams);
    if !servings_per_container.is_finite() || servings_per_container <= 0.0 {
        return Err(ValidationError::InvalidServingCount(servings_per_container).into());
    }

    let record = FinalDish {
        id: String::new(),
        name: draft.name,
        ingredients,
        yield_info: result.yield_info(draft.cooking_method)?,
        nutrient_profile: result.nutrient_profile,
        serving_size_grams: draft.serving_size_grams,
        servings_per_container,
        allergens: draft.allergens,
        notes: draft.notes,
        created_at: String::new(),
        updated_at: String::new(),
    };
    let dish = store.create_final_dish(record).await?;
    warnings.extend(result.warnings);

    info!(
        "Saved final dish {} '{}' with {} new sub-recipe(s)",
        dish.id,
        dish.name,
        sub_recipes.len()
    );
    Ok(SaveRecipeResponse {
        dish,
        sub_recipes,
        warnings,
    })
}

fn check_draft_keys(drafts: &[SubRecipeDraft]) -> Result<(), ValidationError> {
    let mut seen = std::collections::HashSet::new();
    for draft in drafts {
        let key = draft.key.trim();
        if key.is_empty() {
            return Err(ValidationError::Other(format!(
                "sub-recipe draft '{}' has an empty key",
                draft.name
            )));
        }
        if !seen.insert(key) {
            return Err(ValidationError::Other(format!("sub-recipe draft key '{}' is used twice", key)));
        }
    }
    Ok(())
}

fn check_serving_size(grams: f64) -> Result<(), ValidationError> {
    if grams.is_finite() && grams > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidServingSize(grams))
    }
}

/// Point lines that name a draft key at the id it was saved under
fn rewrite_draft_refs(ingredients: Vec<Ingredient>, ids: &HashMap<String, String>) -> Vec<Ingredient> {
    ingredients
        .into_iter()
        .map(|mut ingredient| {
            if let IngredientSource::SubRecipe { sub_recipe_id } = &mut ingredient.source {
                if let Some(id) = ids.get(sub_recipe_id.trim()) {
                    *sub_recipe_id = id.clone();
                }
            }
            ingredient
        })
        .collect()
}

async fn roll_back(store: &dyn RecipeStore, source: CalcError, created: Vec<String>) -> SaveError {
    let mut rolled_back = Vec::new();
    let mut orphaned = Vec::new();
    let mut rollback_errors = Vec::new();

    for id in created.into_iter().rev() {
        match store.delete_sub_recipe(&id).await {
            Ok(true) => rolled_back.push(id),
            Ok(false) => {
                warn!("Rollback: sub-recipe {} was already gone", id);
                rolled_back.push(id);
            }
            Err(e) => {
                rollback_errors.push(format!("{}: {}", id, e));
                orphaned.push(id);
            }
        }
    }

    if orphaned.is_empty() {
        warn!(
            "Save failed ({}); rolled back {} record(s)",
            source,
            rolled_back.len()
        );
        SaveError::Aborted { source, rolled_back }
    } else {
        error!(
            "Save failed ({}) and rollback failed; orphaned records: {}",
            source,
            orphaned.join(", ")
        );
        SaveError::RollbackFailed {
            source,
            orphaned,
            rollback_errors,
        }
    }
}

pub async fn get_sub_recipe(store: &dyn RecipeStore, id: &str) -> CalcResult<Option<SubRecipe>> {
    store.get_sub_recipe(id).await
}

pub async fn list_sub_recipes(store: &dyn RecipeStore) -> CalcResult<Vec<SubRecipeSummary>> {
    let rows = store.list_sub_recipes().await?;
    Ok(rows.iter().map(SubRecipeSummary::from).collect())
}

pub async fn get_final_dish(store: &dyn RecipeStore, id: &str) -> CalcResult<Option<FinalDish>> {
    store.get_final_dish(id).await
}

pub async fn list_final_dishes(store: &dyn RecipeStore) -> CalcResult<Vec<FinalDishSummary>> {
    let rows = store.list_final_dishes().await?;
    Ok(rows.iter().map(FinalDishSummary::from).collect())
}

/// Delete a sub-recipe nothing else uses
pub async fn delete_sub_recipe(store: &dyn RecipeStore, id: &str) -> CalcResult<DeleteResponse> {
    let mut referenced_by: Vec<String> = store
        .list_sub_recipes()
        .await?
        .iter()
        .filter(|s| s.id != id && s.references(id))
        .map(|s| format!("sub-recipe {} ({})", s.id, s.name))
        .collect();
    referenced_by.extend(
        store
            .list_final_dishes()
            .await?
            .iter()
            .filter(|d| d.references(id))
            .map(|d| format!("final dish {} ({})", d.id, d.name)),
    );

    if !referenced_by.is_empty() {
        return Err(CalcError::InUse {
            id: id.to_string(),
            referenced_by,
        });
    }

    let deleted = store.delete_sub_recipe(id).await?;
    if deleted {
        info!("Deleted sub-recipe {}", id);
    }
    Ok(DeleteResponse {
        id: id.to_string(),
        deleted,
    })
}

pub async fn delete_final_dish(store: &dyn RecipeStore, id: &str) -> CalcResult<DeleteResponse> {
    let deleted = store.delete_final_dish(id).await?;
    if deleted {
        info!("Deleted final dish {}", id);
    }
    Ok(DeleteResponse {
        id: id.to_string(),
        deleted,
    })
}

/// Recompute a stored dish from its ingredients and persist the new profile
pub async fn recalculate_final_dish(
    calculator: &RecipeCalculator,
    id: &str,
) -> CalcResult<Option<RecalculateResponse>> {
    let store = calculator.resolver().recipes();
    let Some(mut dish) = store.get_final_dish(id).await? else {
        return Ok(None);
    };

    let previous = dish.nutrient_profile.calories;
    let result = calculator
        .calculate(&dish.ingredients, dish.yield_info.final_cooked_weight_grams())
        .await?;
    dish.yield_info = result.yield_info(dish.yield_info.cooking_method().map(String::from))?;
    dish.nutrient_profile = result.nutrient_profile;

    let Some(dish) = store.update_final_dish(dish).await? else {
        return Ok(None);
    };
    info!(
        "Recalculated final dish {}: {:.1} -> {:.1} kcal/100g",
        dish.id, previous, dish.nutrient_profile.calories
    );
    Ok(Some(RecalculateResponse {
        dish,
        previous_calories_per_100g: previous,
        warnings: result.warnings,
    }))
}

/// Recalculate every stored dish; one dish failing does not stop the rest
pub async fn recalculate_all_final_dishes(calculator: &RecipeCalculator) -> CalcResult<Vec<RecalculationOutcome>> {
    let dishes = calculator.resolver().recipes().list_final_dishes().await?;
    let mut outcomes = Vec::with_capacity(dishes.len());

    for dish in dishes {
        let previous = dish.nutrient_profile.calories;
        let outcome = match recalculate_final_dish(calculator, &dish.id).await {
            Ok(Some(r)) => RecalculationOutcome {
                id: dish.id,
                name: dish.name,
                previous_calories_per_100g: previous,
                calories_per_100g: Some(r.dish.nutrient_profile.calories),
                warning_count: r.warnings.len(),
                error: None,
            },
            Ok(None) => RecalculationOutcome {
                id: dish.id,
                name: dish.name,
                previous_calories_per_100g: previous,
                calories_per_100g: None,
                warning_count: 0,
                error: Some("deleted during recalculation".to_string()),
            },
            Err(e) => {
                warn!("Recalculation of {} failed: {}", dish.id, e);
                RecalculationOutcome {
                    id: dish.id,
                    name: dish.name,
                    previous_calories_per_100g: previous,
                    calories_per_100g: None,
                    warning_count: 0,
                    error: Some(e.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
