//! Database migrations
//!
//! Each step is applied once, in order, inside its own transaction, and
//! recorded in `schema_migrations`. Recipe bodies (ingredients, yield, the
//! computed profile) live in the `data` JSON column; `db::codec` owns that
//! shape, so most model changes need no new step.

use rusqlite::Connection;
use tracing::info;

use super::connection::DbResult;

struct Migration {
    version: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "sub-recipe and final dish tables",
    sql: r#"
        CREATE TABLE sub_recipes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX idx_sub_recipes_name ON sub_recipes(name);

        CREATE TABLE final_dishes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX idx_final_dishes_name ON final_dishes(name);
    "#,
}];

/// Highest version in [`MIGRATIONS`]
pub const SCHEMA_VERSION: i32 = 1;

/// Apply every step newer than the recorded version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )?;

    let current = get_schema_version(conn)?;
    for step in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(step.sql)?;
        tx.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [step.version])?;
        tx.commit()?;
        info!("Applied migration v{}: {}", step.version, step.description);
    }
    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?)
}

pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    Ok(get_schema_version(conn)? < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('sub_recipes', 'final_dishes')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn test_schema_version_matches_last_step() {
        assert_eq!(MIGRATIONS.last().map(|m| m.version), Some(SCHEMA_VERSION));
        assert!(MIGRATIONS.windows(2).all(|w| w[0].version < w[1].version));
    }
}
