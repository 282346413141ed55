//! Database module
//!
//! SQLite persistence for sub-recipes and final dishes.

pub mod codec;
pub mod connection;
pub mod migrations;
pub mod store;

pub use connection::{Database, DbError, DbResult};
pub use store::SqliteRecipeStore;
