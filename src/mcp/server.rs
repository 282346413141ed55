//! nutrilabel MCP Server Implementation
//!
//! Exposes the recipe, label and food tools over MCP.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{CalcError, SaveError, ValidationError};
use crate::models::{
    ConversionTable, FinalDishDraft, Ingredient, IngredientRecord, Nutrient, NutrientProfile, SubRecipeDraft,
};
use crate::nutrition::{convert, percent_dv, round_nutrient, ConversionContext, RecipeCalculator};
use crate::parser::quantity::quantity_problem;
use crate::parser::RecipeParser;
use crate::store::{IngredientStore, RecipeStore};
use crate::tools::{foods, labels, recipes};
use crate::tools::status::{StatusTracker, WORKFLOW};

/// nutrilabel MCP Service
#[derive(Clone)]
pub struct NutrilabelService {
    status_tracker: Arc<StatusTracker>,
    calculator: Arc<RecipeCalculator>,
    parser: Arc<RecipeParser>,
    label_dir: PathBuf,
    tool_router: ToolRouter<NutrilabelService>,
}

impl NutrilabelService {
    pub fn new(
        status_tracker: StatusTracker,
        calculator: RecipeCalculator,
        parser: RecipeParser,
        label_dir: PathBuf,
    ) -> Self {
        Self {
            status_tracker: Arc::new(status_tracker),
            calculator: Arc::new(calculator),
            parser: Arc::new(parser),
            label_dir,
            tool_router: Self::tool_router(),
        }
    }

    fn foods(&self) -> &dyn IngredientStore {
        self.calculator.resolver().foods().as_ref()
    }

    fn recipes(&self) -> &dyn RecipeStore {
        self.calculator.resolver().recipes().as_ref()
    }
}

// ============================================================================
// Parameter Structs
// ============================================================================

/// One ingredient line; set exactly one of `fdc_id` or `sub_recipe_id`
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct IngredientParams {
    pub name: String,
    pub quantity: f64,
    /// Any unit: g, oz, cup, tbsp, "large", or one named in custom_conversions
    pub unit: String,
    /// FoodData Central id
    pub fdc_id: Option<i64>,
    /// Stored sub-recipe id, or a draft key inside save_recipe
    pub sub_recipe_id: Option<String>,
    /// Unit name -> grams per one unit, for this line only
    #[serde(default)]
    pub custom_conversions: BTreeMap<String, f64>,
    pub notes: Option<String>,
}

impl TryFrom<IngredientParams> for Ingredient {
    type Error = ValidationError;

    fn try_from(p: IngredientParams) -> Result<Self, Self::Error> {
        Ingredient::try_from(IngredientRecord {
            name: p.name,
            quantity: p.quantity,
            unit: p.unit,
            fdc_id: p.fdc_id,
            sub_recipe_id: p.sub_recipe_id,
            custom_conversions: p.custom_conversions.into_iter().collect(),
            notes: p.notes,
        })
    }
}

fn to_ingredients(params: Vec<IngredientParams>) -> Result<Vec<Ingredient>, ValidationError> {
    params.into_iter().map(Ingredient::try_from).collect()
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchFoodsParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize { foods::DEFAULT_SEARCH_LIMIT }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConvertUnitParams {
    pub quantity: f64,
    pub unit: String,
    /// Use this food's portion data (FoodData Central id)
    pub fdc_id: Option<i64>,
    #[serde(default)]
    pub custom_conversions: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RoundNutrientParams {
    /// Nutrient name, e.g. "sodium", "total_fat", "vitamin_d"
    pub nutrient: String,
    /// Raw amount per serving in the nutrient's label unit (kcal, g, mg or mcg)
    pub value: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ParseRecipeTextParams {
    /// Recipe text, one ingredient per line; an optional title line first
    pub text: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CalculateRecipeParams {
    pub ingredients: Vec<IngredientParams>,
    /// Weight of the finished, cooked batch in grams
    pub final_cooked_weight_grams: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FormatLabelParams {
    /// Stored final dish to label
    pub dish_id: Option<String>,
    /// Nutrients per 100 g (used when no dish_id is given)
    pub nutrients_per_100g: Option<BTreeMap<String, f64>>,
    pub serving_size_grams: Option<f64>,
    pub servings_per_container: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExportLabelPdfParams {
    pub dish_id: String,
    /// Output file; defaults to the labels directory next to the database
    pub output_path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SubRecipeDraftParams {
    /// Placeholder other lines use as their sub_recipe_id
    pub key: String,
    pub name: String,
    pub ingredients: Vec<IngredientParams>,
    pub final_cooked_weight_grams: f64,
    /// Defaults to the whole batch
    pub serving_size_grams: Option<f64>,
    pub cooking_method: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FinalDishDraftParams {
    pub name: String,
    pub ingredients: Vec<IngredientParams>,
    pub final_cooked_weight_grams: f64,
    pub serving_size_grams: f64,
    /// Defaults to final weight / serving size
    pub servings_per_container: Option<f64>,
    #[serde(default)]
    pub allergens: Vec<String>,
    pub cooking_method: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveRecipeParams {
    #[serde(default)]
    pub sub_recipes: Vec<SubRecipeDraftParams>,
    pub dish: FinalDishDraftParams,
}

impl SaveRecipeParams {
    fn into_request(self) -> Result<recipes::SaveRecipeRequest, ValidationError> {
        let sub_recipes = self
            .sub_recipes
            .into_iter()
            .map(|d| {
                Ok(SubRecipeDraft {
                    key: d.key,
                    name: d.name,
                    ingredients: to_ingredients(d.ingredients)?,
                    final_cooked_weight_grams: d.final_cooked_weight_grams,
                    serving_size_grams: d.serving_size_grams,
                    cooking_method: d.cooking_method,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;
        let d = self.dish;
        Ok(recipes::SaveRecipeRequest {
            sub_recipes,
            dish: FinalDishDraft {
                name: d.name,
                ingredients: to_ingredients(d.ingredients)?,
                final_cooked_weight_grams: d.final_cooked_weight_grams,
                serving_size_grams: d.serving_size_grams,
                servings_per_container: d.servings_per_container,
                allergens: d.allergens,
                cooking_method: d.cooking_method,
                notes: d.notes,
            },
        })
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IdParams {
    pub id: String,
}

// ============================================================================
// Response Helpers
// ============================================================================

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(what: &str, id: &str) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(format!(
        r#"{{"error": "{} not found", "id": {}}}"#,
        what,
        serde_json::Value::String(id.to_string())
    ))]))
}

fn error_kind(e: &CalcError) -> &'static str {
    match e {
        CalcError::Validation(_) => "validation",
        CalcError::ReferenceNotFound { .. } => "reference_not_found",
        CalcError::CircularReference { .. } => "circular_reference",
        CalcError::Upstream(_) => "upstream",
        CalcError::InUse { .. } => "in_use",
        CalcError::Storage(_) => "storage",
    }
}

/// Tool-level failure the caller can act on
fn failure(e: &CalcError) -> Result<CallToolResult, McpError> {
    let body = json!({
        "error": e.to_string(),
        "kind": error_kind(e),
        "retryable": e.is_retryable(),
    });
    Ok(CallToolResult::error(vec![Content::text(body.to_string())]))
}

fn invalid(e: ValidationError) -> Result<CallToolResult, McpError> {
    failure(&CalcError::Validation(e))
}

fn save_failure(e: &SaveError) -> Result<CallToolResult, McpError> {
    let body = match e {
        SaveError::Aborted { source, rolled_back } => json!({
            "error": e.to_string(),
            "kind": error_kind(source),
            "retryable": source.is_retryable(),
            "rolled_back": rolled_back,
        }),
        SaveError::RollbackFailed {
            source,
            orphaned,
            rollback_errors,
        } => json!({
            "error": e.to_string(),
            "kind": error_kind(source),
            "retryable": false,
            "orphaned": orphaned,
            "rollback_errors": rollback_errors,
        }),
    };
    Ok(CallToolResult::error(vec![Content::text(body.to_string())]))
}

#[derive(Debug, Serialize)]
struct ConvertUnitResponse {
    quantity: f64,
    unit: String,
    grams: f64,
    confidence: crate::nutrition::Confidence,
    source: crate::nutrition::ConversionSource,
    approximate: bool,
}

#[derive(Debug, Serialize)]
struct RoundNutrientResponse {
    nutrient: Nutrient,
    display_value: String,
    rounded_number: f64,
    percent_daily_value: Option<u32>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl NutrilabelService {
    // --- Status ---

    #[tool(description = "Get the current status of the nutrilabel service including build info, database and FoodData Central endpoint, plus the label workflow")]
    async fn status(&self) -> Result<CallToolResult, McpError> {
        let status = self.status_tracker.get_status();
        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(json), Content::text(WORKFLOW)]))
    }

    // --- Foods and units ---

    #[tool(description = "Search USDA FoodData Central for foods; returns fdc_id values to use in ingredients")]
    async fn search_foods(&self, Parameters(p): Parameters<SearchFoodsParams>) -> Result<CallToolResult, McpError> {
        match foods::search_foods(self.foods(), &p.query, p.limit).await {
            Ok(result) => to_json(&result),
            Err(e) => failure(&e),
        }
    }

    #[tool(description = "Convert a quantity and unit to grams, using custom conversions, a food's portion data, then standard units")]
    async fn convert_unit(&self, Parameters(p): Parameters<ConvertUnitParams>) -> Result<CallToolResult, McpError> {
        if quantity_problem(p.quantity).is_some() {
            return invalid(ValidationError::InvalidQuantity {
                ingredient: p.unit,
                quantity: p.quantity,
            });
        }
        let portions = match p.fdc_id {
            Some(id) => match self.foods().get_by_id(id).await {
                Ok(Some(record)) => record.portions,
                Ok(None) => return not_found("Food", &id.to_string()),
                Err(e) => return failure(&e),
            },
            None => Vec::new(),
        };
        let table: ConversionTable = p.custom_conversions.into_iter().collect();
        let custom = (!table.is_empty()).then_some(&table);
        let conversion = convert(p.quantity, &p.unit, ConversionContext::new(custom, &portions));
        to_json(&ConvertUnitResponse {
            quantity: p.quantity,
            unit: p.unit,
            grams: conversion.grams,
            confidence: conversion.confidence,
            source: conversion.source,
            approximate: conversion.approximate,
        })
    }

    #[tool(description = "Round a per-serving nutrient amount the way a US Nutrition Facts label declares it, with %DV")]
    fn round_nutrient(&self, Parameters(p): Parameters<RoundNutrientParams>) -> Result<CallToolResult, McpError> {
        let rounded = match round_nutrient(&p.nutrient, p.value) {
            Ok(r) => r,
            Err(e) => return invalid(e),
        };
        to_json(&RoundNutrientResponse {
            nutrient: rounded.nutrient,
            percent_daily_value: percent_dv(rounded.nutrient, rounded.rounded_number),
            display_value: rounded.display_value,
            rounded_number: rounded.rounded_number,
        })
    }

    // --- Recipes ---

    #[tool(description = "Parse free-form recipe text into ingredient lines (quantity, unit, name, notes) and embedded sub-recipes. Lines that cannot be parsed are listed in errors.")]
    fn parse_recipe_text(&self, Parameters(p): Parameters<ParseRecipeTextParams>) -> Result<CallToolResult, McpError> {
        to_json(&self.parser.parse(&p.text))
    }

    #[tool(description = "Calculate nutrients per 100 g of cooked food for a list of ingredients and the final cooked weight, without saving")]
    async fn calculate_recipe(&self, Parameters(p): Parameters<CalculateRecipeParams>) -> Result<CallToolResult, McpError> {
        let ingredients = match to_ingredients(p.ingredients) {
            Ok(i) => i,
            Err(e) => return invalid(e),
        };
        match recipes::calculate(&self.calculator, &ingredients, p.final_cooked_weight_grams).await {
            Ok(result) => to_json(&result),
            Err(e) => failure(&e),
        }
    }

    #[tool(description = "Save a final dish together with any new sub-recipes in one step. Dish ingredients may reference a sub-recipe draft by its key. Nothing is kept if any step fails.")]
    async fn save_recipe(&self, Parameters(p): Parameters<SaveRecipeParams>) -> Result<CallToolResult, McpError> {
        let request = match p.into_request() {
            Ok(r) => r,
            Err(e) => return invalid(e),
        };
        match recipes::save_recipe(&self.calculator, request).await {
            Ok(result) => to_json(&result),
            Err(e) => save_failure(&e),
        }
    }

    #[tool(description = "Get a stored sub-recipe with its ingredients, yield and nutrients per 100 g")]
    async fn get_sub_recipe(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match recipes::get_sub_recipe(self.recipes(), &p.id).await {
            Ok(Some(s)) => to_json(&s),
            Ok(None) => not_found("Sub-recipe", &p.id),
            Err(e) => failure(&e),
        }
    }

    #[tool(description = "List stored sub-recipes")]
    async fn list_sub_recipes(&self) -> Result<CallToolResult, McpError> {
        match recipes::list_sub_recipes(self.recipes()).await {
            Ok(result) => to_json(&result),
            Err(e) => failure(&e),
        }
    }

    #[tool(description = "Delete a sub-recipe. Refused while any sub-recipe or final dish still uses it.")]
    async fn delete_sub_recipe(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match recipes::delete_sub_recipe(self.recipes(), &p.id).await {
            Ok(result) => to_json(&result),
            Err(e) => failure(&e),
        }
    }

    #[tool(description = "Get a stored final dish with its ingredients, yield, serving and nutrients per 100 g")]
    async fn get_final_dish(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match recipes::get_final_dish(self.recipes(), &p.id).await {
            Ok(Some(d)) => to_json(&d),
            Ok(None) => not_found("Final dish", &p.id),
            Err(e) => failure(&e),
        }
    }

    #[tool(description = "List stored final dishes")]
    async fn list_final_dishes(&self) -> Result<CallToolResult, McpError> {
        match recipes::list_final_dishes(self.recipes()).await {
            Ok(result) => to_json(&result),
            Err(e) => failure(&e),
        }
    }

    #[tool(description = "Delete a final dish")]
    async fn delete_final_dish(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match recipes::delete_final_dish(self.recipes(), &p.id).await {
            Ok(result) => to_json(&result),
            Err(e) => failure(&e),
        }
    }

    #[tool(description = "Recalculate a stored final dish from its ingredients (after food data or sub-recipes changed) and save the result")]
    async fn recalculate_final_dish(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match recipes::recalculate_final_dish(&self.calculator, &p.id).await {
            Ok(Some(result)) => to_json(&result),
            Ok(None) => not_found("Final dish", &p.id),
            Err(e) => failure(&e),
        }
    }

    // --- Labels ---

    #[tool(description = "Build the Nutrition Facts label model (rounded values and %DV per serving) for a stored dish, or for explicit nutrients per 100 g plus serving size")]
    async fn format_label(&self, Parameters(p): Parameters<FormatLabelParams>) -> Result<CallToolResult, McpError> {
        if let Some(id) = &p.dish_id {
            let dish = match self.recipes().get_final_dish(id).await {
                Ok(Some(d)) => d,
                Ok(None) => return not_found("Final dish", id),
                Err(e) => return failure(&e),
            };
            return match labels::build_label(&dish) {
                Ok(label) => to_json(&label),
                Err(e) => invalid(e),
            };
        }

        let Some(nutrients) = p.nutrients_per_100g else {
            return invalid(ValidationError::Other(
                "give either dish_id or nutrients_per_100g".to_string(),
            ));
        };
        let mut profile = NutrientProfile::zero();
        for (name, value) in nutrients {
            match name.parse::<Nutrient>() {
                Ok(n) => profile.set(n, value),
                Err(e) => return invalid(e),
            }
        }
        let serving = p.serving_size_grams.unwrap_or(100.0);
        let servings = p.servings_per_container.unwrap_or(1.0);
        match crate::label::format(&profile, serving, servings) {
            Ok(label) => to_json(&label),
            Err(e) => invalid(e),
        }
    }

    #[tool(description = "Write a printable Nutrition Facts PDF for a stored dish")]
    async fn export_label_pdf(&self, Parameters(p): Parameters<ExportLabelPdfParams>) -> Result<CallToolResult, McpError> {
        let dish = match self.recipes().get_final_dish(&p.dish_id).await {
            Ok(Some(d)) => d,
            Ok(None) => return not_found("Final dish", &p.dish_id),
            Err(e) => return failure(&e),
        };
        let label = match labels::build_label(&dish) {
            Ok(l) => l,
            Err(e) => return invalid(e),
        };
        let path = p
            .output_path
            .map(PathBuf::from)
            .unwrap_or_else(|| labels::default_label_path(&self.label_dir, &dish.name));
        let result = labels::export_label_pdf(&label, &dish.name, &path)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        to_json(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for NutrilabelService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nutrilabel".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Nutrition Label Calculator".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "nutrilabel - FDA-style Nutrition Facts labels from recipes. \
                 Call status for the workflow. \
                 Foods: search_foods (USDA FoodData Central), convert_unit. \
                 Recipes: parse_recipe_text, calculate_recipe, save_recipe, \
                 get/list/delete_sub_recipe, get/list/delete_final_dish, recalculate_final_dish. \
                 Labels: format_label, export_label_pdf, round_nutrient. \
                 Nutrients are per 100 g of cooked food; weights are grams."
                    .into(),
            ),
        }
    }
}
