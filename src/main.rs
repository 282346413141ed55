//! Nutrition Label Calculator (nutrilabel)
//!
//! An MCP server that turns recipes into Nutrition Facts labels.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nutrilabel::config::Config;
use nutrilabel::db::{self, Database};
use nutrilabel::mcp::NutrilabelService;
use nutrilabel::parser::RecipeParser;
use nutrilabel::tools::status::StatusTracker;
use nutrilabel::{build_info, calculator_from_config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Output to stderr to not interfere with MCP stdio
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nutrilabel=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = Config::from_env();
    eprintln!("Database path: {}", config.database_path.display());

    let database = Database::open(&config.database_path)?;
    let version = database.with_conn(db::migrations::get_schema_version)?;
    eprintln!("Database schema version: {}", version);

    let parser = RecipeParser::new(config.word_lists()?);
    let label_dir = config
        .database_path
        .parent()
        .map(|p| p.join("labels"))
        .unwrap_or_else(|| "labels".into());

    let calculator = calculator_from_config(&config, database);
    let status = StatusTracker::new(config.database_path.clone(), config.fdc_base_url.clone());
    let service = NutrilabelService::new(status, calculator, parser, label_dir);
    info!("FoodData Central endpoint: {}", config.fdc_base_url);

    let server = service.serve((stdin(), stdout())).await?;
    server.waiting().await?;

    Ok(())
}
