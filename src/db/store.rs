//! SQLite recipe store
//!
//! [`RecipeStore`] over the pooled [`Database`]. Rows are decoded through
//! [`codec`], so a corrupted row surfaces as a validation error naming the
//! record instead of a half-built value. Listings skip such rows with a
//! warning so one bad record does not hide the rest.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info, warn};

use super::codec::{self, RecordRow};
use super::{Database, DbError, DbResult};
use crate::error::{CalcResult, ValidationError};
use crate::models::{FinalDish, SubRecipe};
use crate::store::RecipeStore;

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// `prefix_<unix millis>_<sequence>`; unique within a process and sortable by creation
fn generate_id(prefix: &str) -> String {
    let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), seq)
}

/// Decode every row that can be decoded
fn decode_rows<T>(rows: Vec<RecordRow>, decode: fn(RecordRow) -> Result<T, ValidationError>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match decode(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping unreadable record: {}", e);
                None
            }
        })
        .collect()
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

#[derive(Clone, Copy)]
enum Table {
    SubRecipes,
    FinalDishes,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::SubRecipes => "sub_recipes",
            Table::FinalDishes => "final_dishes",
        }
    }
}

#[derive(Clone)]
pub struct SqliteRecipeStore {
    db: Database,
}

impl SqliteRecipeStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn fetch(&self, table: Table, id: &str) -> DbResult<Option<RecordRow>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT id, name, data, created_at, updated_at FROM {} WHERE id = ?1",
                table.name()
            );
            Ok(conn.query_row(&sql, params![id], RecordRow::from_row).optional()?)
        })
    }

    fn fetch_all(&self, table: Table) -> DbResult<Vec<RecordRow>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT id, name, data, created_at, updated_at FROM {} ORDER BY created_at, rowid",
                table.name()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], RecordRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn insert(&self, table: Table, row: &RecordRow) -> DbResult<()> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO {} (id, name, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                table.name()
            );
            conn.execute(
                &sql,
                params![row.id, row.name, row.data, row.created_at, row.updated_at],
            )?;
            Ok(())
        })
    }

    fn delete(&self, table: Table, id: &str) -> DbResult<bool> {
        self.db.with_conn(|conn| {
            let sql = format!("DELETE FROM {} WHERE id = ?1", table.name());
            let deleted = conn.execute(&sql, params![id])?;
            Ok(deleted > 0)
        })
    }
}

#[async_trait]
impl RecipeStore for SqliteRecipeStore {
    async fn get_sub_recipe(&self, id: &str) -> CalcResult<Option<SubRecipe>> {
        match self.fetch(Table::SubRecipes, id)? {
            Some(row) => Ok(Some(codec::decode_sub_recipe(row)?)),
            None => Ok(None),
        }
    }

    async fn list_sub_recipes(&self) -> CalcResult<Vec<SubRecipe>> {
        let rows = self.fetch_all(Table::SubRecipes)?;
        Ok(decode_rows(rows, codec::decode_sub_recipe))
    }

    async fn create_sub_recipe(&self, mut sub_recipe: SubRecipe) -> CalcResult<SubRecipe> {
        sub_recipe.id = generate_id("sr");
        sub_recipe.created_at = now();
        sub_recipe.updated_at = sub_recipe.created_at.clone();

        let row = RecordRow {
            id: sub_recipe.id.clone(),
            name: sub_recipe.name.clone(),
            data: codec::encode_sub_recipe(&sub_recipe)?,
            created_at: sub_recipe.created_at.clone(),
            updated_at: sub_recipe.updated_at.clone(),
        };
        self.insert(Table::SubRecipes, &row)?;
        info!("Created sub-recipe {} '{}'", sub_recipe.id, sub_recipe.name);
        Ok(sub_recipe)
    }

    async fn delete_sub_recipe(&self, id: &str) -> CalcResult<bool> {
        let deleted = self.delete(Table::SubRecipes, id)?;
        debug!("Delete sub-recipe {}: {}", id, deleted);
        Ok(deleted)
    }

    async fn get_final_dish(&self, id: &str) -> CalcResult<Option<FinalDish>> {
        match self.fetch(Table::FinalDishes, id)? {
            Some(row) => Ok(Some(codec::decode_final_dish(row)?)),
            None => Ok(None),
        }
    }

    async fn list_final_dishes(&self) -> CalcResult<Vec<FinalDish>> {
        let rows = self.fetch_all(Table::FinalDishes)?;
        Ok(decode_rows(rows, codec::decode_final_dish))
    }

    async fn create_final_dish(&self, mut dish: FinalDish) -> CalcResult<FinalDish> {
        dish.id = generate_id("fd");
        dish.created_at = now();
        dish.updated_at = dish.created_at.clone();

        let row = RecordRow {
            id: dish.id.clone(),
            name: dish.name.clone(),
            data: codec::encode_final_dish(&dish)?,
            created_at: dish.created_at.clone(),
            updated_at: dish.updated_at.clone(),
        };
        self.insert(Table::FinalDishes, &row)?;
        info!("Created final dish {} '{}'", dish.id, dish.name);
        Ok(dish)
    }

    async fn update_final_dish(&self, mut dish: FinalDish) -> CalcResult<Option<FinalDish>> {
        let Some(existing) = self.fetch(Table::FinalDishes, &dish.id)? else {
            return Ok(None);
        };
        dish.created_at = existing.created_at;
        dish.updated_at = now();
        let data = codec::encode_final_dish(&dish)?;

        let updated = self.db.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE final_dishes SET name = ?2, data = ?3, updated_at = ?4 WHERE id = ?1",
                params![dish.id, dish.name, data, dish.updated_at],
            )?;
            Ok::<_, DbError>(n > 0)
        })?;
        if !updated {
            return Ok(None);
        }
        info!("Updated final dish {} '{}'", dish.id, dish.name);
        Ok(Some(dish))
    }

    async fn delete_final_dish(&self, id: &str) -> CalcResult<bool> {
        let deleted = self.delete(Table::FinalDishes, id)?;
        debug!("Delete final dish {}: {}", id, deleted);
        Ok(deleted)
    }
}
