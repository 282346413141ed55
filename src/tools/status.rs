//! Status tool
//!
//! Runtime information about the running server.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::build_info::BuildStamp;

/// Workflow notes returned with the status, for MCP clients
pub const WORKFLOW: &str = r#"
# Building a Nutrition Facts label

1. `search_foods` to find FoodData Central ids for each ingredient.
2. `parse_recipe_text` turns pasted recipe text into ingredient lines; attach an
   `fdc_id` (or `sub_recipe_id`) to each before calculating.
3. `calculate_recipe` with the ingredients and the final cooked weight in grams.
   Unknown units are rejected: add a `custom_conversions` entry for them.
4. `save_recipe` stores new sub-recipes and the final dish in one step. Dish
   ingredients may point at a draft sub-recipe by its `key`.
5. `format_label` / `export_label_pdf` produce the label for a saved dish.

Nutrients are stored per 100 g of cooked food. Serving sizes are grams.
"#;

/// Runtime status of the service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub fdc_base_url: String,

    pub uptime_seconds: u64,
    pub process_id: u32,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
    fdc_base_url: String,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf, fdc_base_url: String) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
            fdc_base_url,
        }
    }

    pub fn get_status(&self) -> ServiceStatus {
        let build_info = BuildStamp::current();
        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        ServiceStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            fdc_base_url: self.fdc_base_url.clone(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: std::process::id(),
        }
    }
}
