//! Food search tools

use serde::Serialize;

use crate::error::CalcResult;
use crate::models::FoodSummary;
use crate::store::IngredientStore;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Response for search_foods
#[derive(Debug, Serialize)]
pub struct SearchFoodsResponse {
    pub query: String,
    pub foods: Vec<FoodSummary>,
    pub count: usize,
}

pub async fn search_foods(store: &dyn IngredientStore, query: &str, limit: usize) -> CalcResult<SearchFoodsResponse> {
    let foods = store.search(query, limit.max(1)).await?;
    Ok(SearchFoodsResponse {
        query: query.to_string(),
        count: foods.len(),
        foods,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FoodRecord, NutrientProfile};
    use crate::store::testing::MemoryFoods;

    #[tokio::test]
    async fn test_search_foods() {
        let store = MemoryFoods::default()
            .with(FoodRecord::new(1, "Tomatoes, red, raw", NutrientProfile::zero()))
            .with(FoodRecord::new(2, "Onions, raw", NutrientProfile::zero()));
        let response = search_foods(&store, "tomato", DEFAULT_SEARCH_LIMIT).await.unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.foods[0].fdc_id, 1);

        let response = search_foods(&store, "raw", 0).await.unwrap();
        assert_eq!(response.count, 1);
    }
}
