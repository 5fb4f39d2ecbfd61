//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;
use tracing::info;

use super::connection::DbResult;
use crate::models::{DataSource, NutrientBasis, Nutrients};

/// Current schema version
const SCHEMA_VERSION: i32 = 2;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        info!("applied schema migration v1");
    }

    if current_version < 2 {
        migrate_v2(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (2)", [])?;
        info!("applied schema migration v2");
    }

    Ok(())
}

/// Migration v1: foods table and glycemic reference table
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    let nutrient_columns: String = Nutrients::COLUMNS
        .iter()
        .map(|col| format!("            {} REAL,\n", col))
        .collect();

    let sources = quoted_list(DataSource::ALL.iter().map(|s| s.as_str()));
    let bases = quoted_list(NutrientBasis::ALL.iter().map(|b| b.as_str()));

    let sql = format!(
        r#"
        -- ============================================
        -- FOODS
        -- One row per (name, brand, restaurant, source)
        -- ============================================
        CREATE TABLE foods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK(length(trim(name)) > 0),
            brand TEXT,
            restaurant TEXT,
            source TEXT NOT NULL CHECK(source IN ({sources})),

            external_id TEXT,                    -- barcode or FDC id
            category TEXT,
            serving_size TEXT,                   -- free text, e.g. "4 oz"
            serving_size_grams REAL,
            nutrient_basis TEXT NOT NULL CHECK(nutrient_basis IN ({bases})),

            -- Nutrients, NULL = unknown (never coerced to 0)
{nutrient_columns}
            glycemic_index INTEGER CHECK(glycemic_index IS NULL OR glycemic_index BETWEEN 0 AND 100),
            glycemic_load REAL,

            -- Metadata
            search_terms TEXT NOT NULL DEFAULT '',
            popularity_score INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- NULL brand/restaurant compare equal for identity purposes
        CREATE UNIQUE INDEX idx_foods_identity
            ON foods(name, IFNULL(brand, ''), IFNULL(restaurant, ''), source);
        CREATE INDEX idx_foods_name ON foods(name);
        CREATE INDEX idx_foods_brand ON foods(brand);
        CREATE INDEX idx_foods_restaurant ON foods(restaurant);
        CREATE INDEX idx_foods_category ON foods(category);
        CREATE INDEX idx_foods_external_id ON foods(external_id);

        -- ============================================
        -- GLYCEMIC INDEX REFERENCE
        -- Keyword table used for estimation, shipped for the app
        -- ============================================
        CREATE TABLE glycemic_index_ref (
            keyword TEXT PRIMARY KEY,
            glycemic_index INTEGER NOT NULL CHECK(glycemic_index BETWEEN 0 AND 100),
            food_group TEXT NOT NULL
        );
        "#
    );

    conn.execute_batch(&sql)?;
    Ok(())
}

/// Migration v2: search synonyms
fn migrate_v2(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE food_synonyms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            primary_name TEXT NOT NULL,
            synonym TEXT NOT NULL,             -- stored lowercase
            language TEXT NOT NULL DEFAULT 'en',
            UNIQUE(primary_name, synonym)
        );
        CREATE INDEX idx_food_synonyms_synonym ON food_synonyms(synonym);
        "#,
    )?;
    Ok(())
}

fn quoted_list<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values
        .map(|v| format!("'{}'", v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());
    }

    #[test]
    fn test_v1_database_gains_synonyms_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE schema_migrations (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL DEFAULT (datetime('now')))",
            [],
        )
        .unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", []).unwrap();
        assert!(needs_migration(&conn).unwrap());

        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 2);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM food_synonyms", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_identity_index_treats_null_brand_as_equal() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let insert = "INSERT INTO foods (name, source, nutrient_basis) VALUES ('Taco', 'manual', 'per_serving')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());

        // Same name under another source is a different identity
        conn.execute(
            "INSERT INTO foods (name, source, nutrient_basis) VALUES ('Taco', 'international', 'per_100g')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_rejects_out_of_range_glycemic_index() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO foods (name, source, nutrient_basis, glycemic_index)
             VALUES ('Dates', 'manual', 'per_serving', 103)",
            [],
        );
        assert!(result.is_err());
    }
}
