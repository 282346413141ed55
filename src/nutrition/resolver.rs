//! Ingredient resolution
//!
//! Looks up the per-100 g profile behind each ingredient line, from the food
//! database or by expanding a stored sub-recipe. Lookups for sibling lines
//! run concurrently. Sub-recipe expansion threads the path of sub-recipe ids
//! currently being expanded through every recursive call; meeting an id that
//! is already on the path is a circular reference.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{try_join_all, BoxFuture, FutureExt};
use tracing::{debug, warn};

use crate::error::{CalcError, CalcResult, DataQualityWarning, UpstreamError, UpstreamKind};
use crate::models::{
    ConversionTable, FoodPortion, FoodRecord, Ingredient, IngredientSource, Nutrient, NutrientProfile, SubRecipe,
};
use crate::store::{IngredientStore, RecipeStore};
use super::calculator::{aggregate, CalculationOptions};

/// Units a sub-recipe can always be measured in, besides mass and volume
const SERVING_UNIT: &str = "serving";
const BATCH_UNITS: &[&str] = &["batch", "recipe"];

/// An ingredient line with its nutrient data attached
#[derive(Debug, Clone)]
pub struct ResolvedIngredient {
    pub ingredient: Ingredient,
    /// Per 100 g
    pub profile: NutrientProfile,
    /// Supplier portion data for the referenced food
    pub portions: Vec<FoodPortion>,
    /// Conversions implied by the referenced record (sub-recipe servings)
    pub derived_conversions: ConversionTable,
    pub warnings: Vec<DataQualityWarning>,
}

impl ResolvedIngredient {
    pub fn new(ingredient: Ingredient, profile: NutrientProfile) -> Self {
        Self {
            ingredient,
            profile,
            portions: Vec::new(),
            derived_conversions: ConversionTable::new(),
            warnings: Vec::new(),
        }
    }

    /// Custom conversions for this line, the line's own entries taking precedence
    pub fn conversion_table(&self) -> ConversionTable {
        let mut table = self.derived_conversions.clone();
        for (unit, grams) in self.ingredient.custom_conversions.iter() {
            table.insert(unit.clone(), *grams);
        }
        table
    }
}

/// Fetches nutrient data for ingredients
#[derive(Clone)]
pub struct IngredientResolver {
    foods: Arc<dyn IngredientStore>,
    recipes: Arc<dyn RecipeStore>,
    options: CalculationOptions,
}

impl IngredientResolver {
    pub fn new(
        foods: Arc<dyn IngredientStore>,
        recipes: Arc<dyn RecipeStore>,
        options: CalculationOptions,
    ) -> Self {
        Self {
            foods,
            recipes,
            options,
        }
    }

    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    pub fn foods(&self) -> &Arc<dyn IngredientStore> {
        &self.foods
    }

    pub fn recipes(&self) -> &Arc<dyn RecipeStore> {
        &self.recipes
    }

    pub async fn resolve(&self, ingredient: &Ingredient) -> CalcResult<ResolvedIngredient> {
        self.resolve_within(ingredient, Vec::new()).await
    }

    /// Resolve sibling lines concurrently; the first failure wins
    ///
    /// `path` holds the ids of sub-recipes being expanded above these lines.
    pub fn resolve_all_within<'a>(
        &'a self,
        ingredients: &'a [Ingredient],
        path: Vec<String>,
    ) -> BoxFuture<'a, CalcResult<Vec<ResolvedIngredient>>> {
        async move {
            try_join_all(
                ingredients
                    .iter()
                    .map(|ingredient| self.resolve_within(ingredient, path.clone())),
            )
            .await
        }
        .boxed()
    }

    fn resolve_within<'a>(
        &'a self,
        ingredient: &'a Ingredient,
        path: Vec<String>,
    ) -> BoxFuture<'a, CalcResult<ResolvedIngredient>> {
        async move {
            match &ingredient.source {
                IngredientSource::Food { fdc_id } => {
                    self.resolve_food(ingredient, *fdc_id).await
                }
                IngredientSource::SubRecipe { sub_recipe_id } => {
                    self.resolve_sub_recipe(ingredient, sub_recipe_id, path).await
                }
            }
        }
        .boxed()
    }

    async fn resolve_food(&self, ingredient: &Ingredient, fdc_id: i64) -> CalcResult<ResolvedIngredient> {
        let record = self
            .bounded("food database", self.foods.get_by_id(fdc_id))
            .await?
            .ok_or_else(|| not_found(ingredient))?;
        debug!("Resolved '{}' to food #{} ({})", ingredient.name, fdc_id, record.description);

        let (profile, warnings) = checked_food_profile(&ingredient.name, &record);
        Ok(ResolvedIngredient {
            ingredient: ingredient.clone(),
            profile,
            portions: record.portions,
            derived_conversions: ConversionTable::new(),
            warnings,
        })
    }

    async fn resolve_sub_recipe(
        &self,
        ingredient: &Ingredient,
        sub_recipe_id: &str,
        mut path: Vec<String>,
    ) -> CalcResult<ResolvedIngredient> {
        if let Some(start) = path.iter().position(|id| id == sub_recipe_id) {
            let mut chain = path.split_off(start);
            chain.push(sub_recipe_id.to_string());
            warn!("Circular sub-recipe reference: {}", chain.join(" -> "));
            return Err(CalcError::CircularReference { chain });
        }

        let sub = self
            .bounded("recipe store", self.recipes.get_sub_recipe(sub_recipe_id))
            .await?
            .ok_or_else(|| not_found(ingredient))?;

        let (profile, warnings) = if sub.ingredients.is_empty() {
            let (profile, mut warnings) = sub.nutrient_profile.sanitized(&sub.name);
            warnings.push(DataQualityWarning::new(
                &sub.name,
                "sub-recipe has no ingredients; using its stored profile",
            ));
            (profile, warnings)
        } else {
            path.push(sub_recipe_id.to_string());
            let lines = self.resolve_all_within(&sub.ingredients, path).await?;
            let result = aggregate(&lines, sub.yield_info.final_cooked_weight_grams(), &self.options)?;
            (result.nutrient_profile, result.warnings)
        };

        debug!(
            "Expanded sub-recipe '{}' ({}) for '{}'",
            sub.name, sub.id, ingredient.name
        );
        Ok(ResolvedIngredient {
            ingredient: ingredient.clone(),
            profile,
            portions: Vec::new(),
            derived_conversions: sub_recipe_units(&sub),
            warnings: warnings
                .into_iter()
                .map(|w| w.nested_in(&ingredient.name))
                .collect(),
        })
    }

    async fn bounded<T>(
        &self,
        service: &str,
        call: impl Future<Output = CalcResult<T>>,
    ) -> CalcResult<T> {
        match tokio::time::timeout(self.options.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::new(
                service,
                UpstreamKind::Timeout,
                format!("no answer within {}s", self.options.store_timeout.as_secs_f64()),
            )
            .into()),
        }
    }
}

fn not_found(ingredient: &Ingredient) -> CalcError {
    CalcError::ReferenceNotFound {
        ingredient: ingredient.name.clone(),
        reference: ingredient.source.describe(),
    }
}

fn sub_recipe_units(sub: &SubRecipe) -> ConversionTable {
    let mut table = ConversionTable::new();
    if sub.serving_size_grams.is_finite() && sub.serving_size_grams > 0.0 {
        table.insert(SERVING_UNIT, sub.serving_size_grams);
    }
    for unit in BATCH_UNITS {
        table.insert(*unit, sub.yield_info.final_cooked_weight_grams());
    }
    table
}

/// Sanitize a fetched food profile and correct impossible relationships
///
/// Every change is reported; nothing is corrected silently.
pub fn checked_food_profile(subject: &str, record: &FoodRecord) -> (NutrientProfile, Vec<DataQualityWarning>) {
    let (mut profile, mut warnings) = record.profile.sanitized(subject);

    for nutrient in &record.missing {
        warnings.push(DataQualityWarning::new(
            subject,
            format!(
                "{} is missing from food #{}; counted as 0",
                nutrient.label(),
                record.fdc_id
            ),
        ));
    }

    let mut cap = |part: Nutrient, whole: Nutrient| {
        let (part_value, whole_value) = (profile.get(part), profile.get(whole));
        if part_value > whole_value {
            warnings.push(DataQualityWarning::new(
                subject,
                format!(
                    "{} ({}) exceeds {} ({}); capped",
                    part.label(),
                    part_value,
                    whole.label(),
                    whole_value
                ),
            ));
            profile.set(part, whole_value);
        }
    };
    cap(Nutrient::TotalSugars, Nutrient::TotalCarbohydrate);
    cap(Nutrient::AddedSugars, Nutrient::TotalSugars);
    cap(Nutrient::DietaryFiber, Nutrient::TotalCarbohydrate);
    cap(Nutrient::SaturatedFat, Nutrient::TotalFat);
    cap(Nutrient::TransFat, Nutrient::TotalFat);

    for w in &warnings {
        warn!("Data quality: {}", w);
    }
    (profile, warnings)
}
