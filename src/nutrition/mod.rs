//! Nutrition calculation module
//!
//! Unit conversion, ingredient resolution, recipe aggregation and label rounding.

pub mod calculator;
pub mod converter;
pub mod daily_values;
pub mod resolver;
pub mod rounding;
pub mod units;

pub use calculator::{
    aggregate, validate_inputs, CalculationOptions, CalculationResult, LineBreakdown, RecipeCalculator,
};
pub use converter::{convert, Conversion, ConversionContext, ConversionSource};
pub use daily_values::{daily_value, percent_dv};
pub use resolver::{checked_food_profile, IngredientResolver, ResolvedIngredient};
pub use rounding::{percent_daily_value, round_nutrient, round_value, RoundedValue};
pub use units::{categorize_unit, is_known_unit, normalize_unit, standard_unit, Confidence, UnitCategory};
