//! Recipe calculator
//!
//! Turns an ingredient list and a final cooked weight into a per-100 g
//! profile of the cooked dish:
//!
//! 1. each line is converted to grams and its per-100 g profile scaled by
//!    `grams / 100`
//! 2. contributions are summed field by field, as are the grams
//! 3. the total is normalized by `100 / final_cooked_weight`
//!
//! Step 3 is what accounts for moisture lost or gained while cooking.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CalcResult, DataQualityWarning, ValidationError};
use crate::models::{Ingredient, NutrientProfile, YieldInfo};
use super::converter::{convert, ConversionContext, ConversionSource};
use super::resolver::{IngredientResolver, ResolvedIngredient};
use super::units::Confidence;

/// Yield percentages outside this range get a warning
pub const LOW_YIELD_PCT: f64 = 50.0;
pub const HIGH_YIELD_PCT: f64 = 150.0;

/// Knobs shared by the resolver and calculator
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationOptions {
    /// Grams per unit assumed for units with no known conversion.
    /// `None` rejects such lines instead.
    pub unknown_unit_grams: Option<f64>,
    /// Upper bound on a single store call made during resolution
    pub store_timeout: Duration,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            unknown_unit_grams: None,
            store_timeout: Duration::from_secs(10),
        }
    }
}

/// How one ingredient line was weighed
#[derive(Debug, Clone, Serialize)]
pub struct LineBreakdown {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub grams: f64,
    pub confidence: Confidence,
    pub source: ConversionSource,
    pub calories: f64,
}

/// Output of a recipe calculation
#[derive(Debug, Clone, Serialize)]
pub struct CalculationResult {
    /// Per 100 g of final cooked weight
    pub nutrient_profile: NutrientProfile,
    pub raw_total_weight_grams: f64,
    pub final_cooked_weight_grams: f64,
    pub yield_percentage: f64,
    pub lines: Vec<LineBreakdown>,
    pub warnings: Vec<DataQualityWarning>,
}

impl CalculationResult {
    pub fn yield_info(&self, cooking_method: Option<String>) -> Result<YieldInfo, ValidationError> {
        YieldInfo::new(
            self.raw_total_weight_grams,
            self.final_cooked_weight_grams,
            cooking_method,
        )
    }

    /// Total nutrients in the whole cooked batch
    pub fn batch_totals(&self) -> NutrientProfile {
        self.nutrient_profile.scale(self.final_cooked_weight_grams / 100.0)
    }
}

/// Reject an input before any store is contacted
pub fn validate_inputs(ingredients: &[Ingredient], final_cooked_weight_grams: f64) -> Result<(), ValidationError> {
    if ingredients.is_empty() {
        return Err(ValidationError::EmptyIngredientList);
    }
    for ingredient in ingredients {
        ingredient.validate_quantity()?;
    }
    if !final_cooked_weight_grams.is_finite() || final_cooked_weight_grams <= 0.0 {
        return Err(ValidationError::InvalidFinalWeight(final_cooked_weight_grams));
    }
    Ok(())
}

/// Aggregate already-resolved lines
///
/// Pure: no store access. Used for top-level recipes and for sub-recipes
/// expanded during resolution.
pub fn aggregate(
    lines: &[ResolvedIngredient],
    final_cooked_weight_grams: f64,
    options: &CalculationOptions,
) -> CalcResult<CalculationResult> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyIngredientList.into());
    }

    let mut warnings = Vec::new();
    let mut breakdown = Vec::with_capacity(lines.len());
    let mut total = NutrientProfile::zero();
    let mut raw_total_weight_grams = 0.0;

    for line in lines {
        let ingredient = &line.ingredient;
        ingredient.validate_quantity()?;
        warnings.extend(line.warnings.iter().cloned());

        let conversions = line.conversion_table();
        let conversion = convert(
            ingredient.quantity,
            &ingredient.unit,
            ConversionContext::new(Some(&conversions), &line.portions),
        );

        let grams = match conversion.confidence {
            Confidence::Unknown => match options.unknown_unit_grams {
                Some(estimate) => {
                    warnings.push(DataQualityWarning::new(
                        &ingredient.name,
                        format!(
                            "unit '{}' has no known weight; estimated {} g per unit",
                            ingredient.unit, estimate
                        ),
                    ));
                    ingredient.quantity * estimate
                }
                None => {
                    return Err(ValidationError::UnknownUnit {
                        ingredient: ingredient.name.clone(),
                        unit: ingredient.unit.clone(),
                    }
                    .into())
                }
            },
            _ if conversion.approximate => {
                warnings.push(DataQualityWarning::new(
                    &ingredient.name,
                    format!(
                        "'{}' is an approximate measure ({:.1} g); weigh it for an accurate label",
                        ingredient.unit, conversion.grams
                    ),
                ));
                conversion.grams
            }
            _ => conversion.grams,
        };

        let contribution = line.profile.scale(grams / 100.0);
        debug!(
            "{}: {} {} = {:.2} g ({:?})",
            ingredient.name, ingredient.quantity, ingredient.unit, grams, conversion.source
        );

        breakdown.push(LineBreakdown {
            name: ingredient.name.clone(),
            quantity: ingredient.quantity,
            unit: ingredient.unit.clone(),
            grams,
            confidence: conversion.confidence,
            source: conversion.source,
            calories: contribution.calories,
        });
        total = total + contribution;
        raw_total_weight_grams += grams;
    }

    if !final_cooked_weight_grams.is_finite() || final_cooked_weight_grams <= 0.0 {
        return Err(ValidationError::InvalidFinalWeight(final_cooked_weight_grams).into());
    }
    if !raw_total_weight_grams.is_finite() || raw_total_weight_grams <= 0.0 {
        return Err(ValidationError::InvalidRawWeight(raw_total_weight_grams).into());
    }

    let normalized = total.scale(100.0 / final_cooked_weight_grams);
    let yield_percentage = final_cooked_weight_grams / raw_total_weight_grams * 100.0;

    if yield_percentage < LOW_YIELD_PCT || yield_percentage > HIGH_YIELD_PCT {
        warnings.push(DataQualityWarning::new(
            "recipe",
            format!(
                "yield is {:.0}% ({:.0} g raw, {:.0} g cooked); check the final cooked weight",
                yield_percentage, raw_total_weight_grams, final_cooked_weight_grams
            ),
        ));
    }

    let (nutrient_profile, invalid) = normalized.sanitized("recipe");
    warnings.extend(invalid);

    Ok(CalculationResult {
        nutrient_profile,
        raw_total_weight_grams,
        final_cooked_weight_grams,
        yield_percentage,
        lines: breakdown,
        warnings,
    })
}

/// Resolves ingredients through the stores and aggregates them
pub struct RecipeCalculator {
    resolver: IngredientResolver,
}

impl RecipeCalculator {
    pub fn new(resolver: IngredientResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &IngredientResolver {
        &self.resolver
    }

    pub async fn calculate(
        &self,
        ingredients: &[Ingredient],
        final_cooked_weight_grams: f64,
    ) -> CalcResult<CalculationResult> {
        self.calculate_for(None, ingredients, final_cooked_weight_grams)
            .await
    }

    /// Calculate on behalf of a stored sub-recipe
    ///
    /// `owner` is treated as already being expanded, so an ingredient list
    /// that leads back to it fails as a circular reference.
    pub async fn calculate_for(
        &self,
        owner: Option<&str>,
        ingredients: &[Ingredient],
        final_cooked_weight_grams: f64,
    ) -> CalcResult<CalculationResult> {
        validate_inputs(ingredients, final_cooked_weight_grams)?;

        let path = owner.map(|id| vec![id.to_string()]).unwrap_or_default();
        let lines = self.resolver.resolve_all_within(ingredients, path).await?;
        let result = aggregate(&lines, final_cooked_weight_grams, self.resolver.options())?;

        info!(
            "Calculated {} ingredient(s): {:.1} g raw -> {:.1} g cooked, {:.1} kcal/100g, {} warning(s)",
            ingredients.len(),
            result.raw_total_weight_grams,
            result.final_cooked_weight_grams,
            result.nutrient_profile.calories,
            result.warnings.len()
        );
        Ok(result)
    }
}
