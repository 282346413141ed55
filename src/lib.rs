//! Nutrition Label Calculator (nutrilabel) Library
//!
//! Recipe-to-label pipeline: unit conversion, ingredient resolution against
//! FoodData Central and stored sub-recipes, per-100 g aggregation, FDA
//! rounding and Nutrition Facts rendering.

pub mod build_info;
pub mod config;
pub mod db;
pub mod error;
pub mod fdc;
pub mod label;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod parser;
pub mod store;
pub mod tools;
pub mod upstream;

pub use error::{CalcError, CalcResult, DataQualityWarning, SaveError, UpstreamError, ValidationError};

use std::sync::Arc;

use config::Config;
use db::{Database, SqliteRecipeStore};
use fdc::FdcClient;
use nutrition::{IngredientResolver, RecipeCalculator};

/// Calculator wired to FoodData Central and the SQLite store named by `config`
pub fn calculator_from_config(config: &Config, database: Database) -> RecipeCalculator {
    let foods = FdcClient::new(
        config.fdc_base_url.clone(),
        config.fdc_api_key.clone(),
        config.retry_policy(),
    );
    let recipes = SqliteRecipeStore::new(database);
    RecipeCalculator::new(IngredientResolver::new(
        Arc::new(foods),
        Arc::new(recipes),
        config.calculation_options(),
    ))
}
