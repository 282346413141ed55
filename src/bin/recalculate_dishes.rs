//! Recalculate stored final dishes from their ingredients
//! Usage: cargo run --bin recalculate_dishes -- [dish_id]

use tracing_subscriber::EnvFilter;

use nutrilabel::calculator_from_config;
use nutrilabel::config::Config;
use nutrilabel::db::Database;
use nutrilabel::tools::recipes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nutrilabel=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    println!("Database: {}", config.database_path.display());

    let database = Database::open(&config.database_path)?;
    let calculator = calculator_from_config(&config, database);

    if let Some(id) = std::env::args().nth(1) {
        match recipes::recalculate_final_dish(&calculator, &id).await? {
            Some(result) => {
                println!("{} ({})", result.dish.name, result.dish.id);
                println!("  Old calories/100g: {:.1}", result.previous_calories_per_100g);
                println!("  New calories/100g: {:.1}", result.dish.nutrient_profile.calories);
                for warning in &result.warnings {
                    println!("  Warning: {}", warning);
                }
            }
            None => println!("No final dish with id {}", id),
        }
        return Ok(());
    }

    let outcomes = recipes::recalculate_all_final_dishes(&calculator).await?;
    println!("Found {} final dishes", outcomes.len());

    let mut failed = 0;
    for outcome in &outcomes {
        println!("\n{} ({})", outcome.name, outcome.id);
        println!("  Old calories/100g: {:.1}", outcome.previous_calories_per_100g);
        match (&outcome.error, outcome.calories_per_100g) {
            (Some(error), _) => {
                failed += 1;
                println!("  FAILED: {}", error);
            }
            (None, Some(calories)) => {
                println!("  New calories/100g: {:.1}", calories);
                println!("  Difference: {:.1}", calories - outcome.previous_calories_per_100g);
                if outcome.warning_count > 0 {
                    println!("  Warnings: {}", outcome.warning_count);
                }
            }
            (None, None) => {}
        }
    }

    println!("\nDone: {} recalculated, {} failed", outcomes.len() - failed, failed);
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
