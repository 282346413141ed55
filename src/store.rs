//! External store contracts
//!
//! The calculation core talks to its collaborators only through these
//! traits: the food database (FoodData Central) and recipe persistence
//! (SQLite). Implementations live in `fdc` and `db`.

use async_trait::async_trait;

use crate::error::CalcResult;
use crate::models::{FinalDish, FoodRecord, FoodSummary, SubRecipe};

/// External food database
#[async_trait]
pub trait IngredientStore: Send + Sync {
    /// Candidate foods for a free-text query
    async fn search(&self, query: &str, limit: usize) -> CalcResult<Vec<FoodSummary>>;

    /// Nutrient and portion data for one food; `None` if the id is unknown
    async fn get_by_id(&self, fdc_id: i64) -> CalcResult<Option<FoodRecord>>;
}

/// Persistence for sub-recipes and final dishes
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn get_sub_recipe(&self, id: &str) -> CalcResult<Option<SubRecipe>>;
    async fn list_sub_recipes(&self) -> CalcResult<Vec<SubRecipe>>;
    /// Stores the record under a freshly generated id and returns it
    async fn create_sub_recipe(&self, sub_recipe: SubRecipe) -> CalcResult<SubRecipe>;
    async fn delete_sub_recipe(&self, id: &str) -> CalcResult<bool>;

    async fn get_final_dish(&self, id: &str) -> CalcResult<Option<FinalDish>>;
    async fn list_final_dishes(&self) -> CalcResult<Vec<FinalDish>>;
    async fn create_final_dish(&self, dish: FinalDish) -> CalcResult<FinalDish>;
    async fn update_final_dish(&self, dish: FinalDish) -> CalcResult<Option<FinalDish>>;
    async fn delete_final_dish(&self, id: &str) -> CalcResult<bool>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory stores for unit tests

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryFoods {
        foods: HashMap<i64, FoodRecord>,
        pub lookups: AtomicUsize,
    }

    impl MemoryFoods {
        pub fn with(mut self, record: FoodRecord) -> Self {
            self.foods.insert(record.fdc_id, record);
            self
        }
    }

    #[async_trait]
    impl IngredientStore for MemoryFoods {
        async fn search(&self, query: &str, limit: usize) -> CalcResult<Vec<FoodSummary>> {
            let query = query.to_lowercase();
            Ok(self
                .foods
                .values()
                .filter(|f| f.description.to_lowercase().contains(&query))
                .take(limit)
                .map(|f| FoodSummary {
                    fdc_id: f.fdc_id,
                    description: f.description.clone(),
                    data_type: f.data_type.clone(),
                    brand_owner: None,
                })
                .collect())
        }

        async fn get_by_id(&self, fdc_id: i64) -> CalcResult<Option<FoodRecord>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.foods.get(&fdc_id).cloned())
        }
    }

    #[derive(Default)]
    pub struct MemoryRecipes {
        pub sub_recipes: Mutex<Vec<SubRecipe>>,
        pub dishes: Mutex<Vec<FinalDish>>,
        next_id: AtomicUsize,
        /// Fail every create after this many have succeeded
        pub fail_creates_after: Option<usize>,
        pub fail_deletes: bool,
    }

    impl MemoryRecipes {
        pub fn failing_creates_after(mut self, successes: usize) -> Self {
            self.fail_creates_after = Some(successes);
            self
        }

        pub fn failing_deletes(mut self) -> Self {
            self.fail_deletes = true;
            self
        }

        pub fn with_sub_recipe(self, sub_recipe: SubRecipe) -> Self {
            self.sub_recipes.lock().unwrap().push(sub_recipe);
            self
        }

        fn next(&self, prefix: &str) -> CalcResult<String> {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            if let Some(limit) = self.fail_creates_after {
                if n >= limit {
                    return Err(crate::error::UpstreamError::new(
                        "memory store",
                        crate::error::UpstreamKind::Network,
                        "connection reset",
                    )
                    .into());
                }
            }
            Ok(format!("{}_{}", prefix, n + 1))
        }
    }

    #[async_trait]
    impl RecipeStore for MemoryRecipes {
        async fn get_sub_recipe(&self, id: &str) -> CalcResult<Option<SubRecipe>> {
            Ok(self.sub_recipes.lock().unwrap().iter().find(|s| s.id == id).cloned())
        }

        async fn list_sub_recipes(&self) -> CalcResult<Vec<SubRecipe>> {
            Ok(self.sub_recipes.lock().unwrap().clone())
        }

        async fn create_sub_recipe(&self, mut sub_recipe: SubRecipe) -> CalcResult<SubRecipe> {
            sub_recipe.id = self.next("sr")?;
            self.sub_recipes.lock().unwrap().push(sub_recipe.clone());
            Ok(sub_recipe)
        }

        async fn delete_sub_recipe(&self, id: &str) -> CalcResult<bool> {
            if self.fail_deletes {
                return Err(crate::error::UpstreamError::new(
                    "memory store",
                    crate::error::UpstreamKind::Timeout,
                    "delete timed out",
                )
                .into());
            }
            let mut rows = self.sub_recipes.lock().unwrap();
            let before = rows.len();
            rows.retain(|s| s.id != id);
            Ok(rows.len() != before)
        }

        async fn get_final_dish(&self, id: &str) -> CalcResult<Option<FinalDish>> {
            Ok(self.dishes.lock().unwrap().iter().find(|d| d.id == id).cloned())
        }

        async fn list_final_dishes(&self) -> CalcResult<Vec<FinalDish>> {
            Ok(self.dishes.lock().unwrap().clone())
        }

        async fn create_final_dish(&self, mut dish: FinalDish) -> CalcResult<FinalDish> {
            dish.id = self.next("fd")?;
            self.dishes.lock().unwrap().push(dish.clone());
            Ok(dish)
        }

        async fn update_final_dish(&self, dish: FinalDish) -> CalcResult<Option<FinalDish>> {
            let mut rows = self.dishes.lock().unwrap();
            match rows.iter_mut().find(|d| d.id == dish.id) {
                Some(row) => {
                    *row = dish.clone();
                    Ok(Some(dish))
                }
                None => Ok(None),
            }
        }

        async fn delete_final_dish(&self, id: &str) -> CalcResult<bool> {
            let mut rows = self.dishes.lock().unwrap();
            let before = rows.len();
            rows.retain(|d| d.id != id);
            Ok(rows.len() != before)
        }
    }
}
