//! Database statistics

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::build_info::BuildInfo;
use crate::db::migrations::get_schema_version;
use crate::db::{Database, DbResult};
use crate::glycemic::GiLevel;

/// Foods per glycemic index band
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GiLevelCounts {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
}

/// Snapshot of what a built database contains
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub build: BuildInfo,
    pub generated_at: DateTime<Utc>,
    pub database_path: String,
    pub schema_version: i32,
    pub total_foods: i64,
    pub by_source: BTreeMap<String, i64>,
    pub by_basis: BTreeMap<String, i64>,
    pub restaurants: i64,
    pub with_glycemic_index: i64,
    pub with_glycemic_load: i64,
    pub gi_levels: GiLevelCounts,
    pub reference_keywords: i64,
    pub synonyms: i64,
}

fn count(conn: &Connection, sql: &str) -> DbResult<i64> {
    Ok(conn.query_row(sql, [], |row| row.get(0))?)
}

fn grouped(conn: &Connection, column: &str) -> DbResult<BTreeMap<String, i64>> {
    let sql = format!("SELECT {0}, COUNT(*) FROM foods GROUP BY {0}", column);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(rows)
}

/// Collect statistics
pub fn collect_stats(db: &Database) -> DbResult<DatabaseStats> {
    db.with_conn(|conn| {
        let mut gi_levels = GiLevelCounts::default();
        let mut stmt = conn.prepare("SELECT glycemic_index FROM foods WHERE glycemic_index IS NOT NULL")?;
        let indexes = stmt
            .query_map([], |row| row.get::<_, u8>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        for index in indexes {
            match GiLevel::from_index(index) {
                GiLevel::Low => gi_levels.low += 1,
                GiLevel::Medium => gi_levels.medium += 1,
                GiLevel::High => gi_levels.high += 1,
            }
        }

        Ok(DatabaseStats {
            build: BuildInfo::current(),
            generated_at: Utc::now(),
            database_path: db.path().display().to_string(),
            schema_version: get_schema_version(conn)?,
            total_foods: count(conn, "SELECT COUNT(*) FROM foods")?,
            by_source: grouped(conn, "source")?,
            by_basis: grouped(conn, "nutrient_basis")?,
            restaurants: count(
                conn,
                "SELECT COUNT(DISTINCT restaurant) FROM foods WHERE restaurant IS NOT NULL",
            )?,
            with_glycemic_index: count(conn, "SELECT COUNT(*) FROM foods WHERE glycemic_index IS NOT NULL")?,
            with_glycemic_load: count(conn, "SELECT COUNT(*) FROM foods WHERE glycemic_load IS NOT NULL")?,
            gi_levels,
            reference_keywords: count(conn, "SELECT COUNT(*) FROM glycemic_index_ref")?,
            synonyms: count(conn, "SELECT COUNT(*) FROM food_synonyms")?,
        })
    })
}

impl DatabaseStats {
    /// Human-readable report
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Database: {}", self.database_path);
        let _ = writeln!(out, "Schema version: {}", self.schema_version);
        let _ = writeln!(out, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = writeln!(out, "Total foods: {}", self.total_foods);

        let _ = writeln!(out, "\nBy source:");
        for (source, n) in &self.by_source {
            let _ = writeln!(out, "  {:<18} {}", source, n);
        }
        let _ = writeln!(out, "\nBy nutrient basis:");
        for (basis, n) in &self.by_basis {
            let _ = writeln!(out, "  {:<18} {}", basis, n);
        }

        let _ = writeln!(out, "\nRestaurants: {}", self.restaurants);
        let _ = writeln!(out, "With glycemic index: {}", self.with_glycemic_index);
        let _ = writeln!(out, "With glycemic load: {}", self.with_glycemic_load);
        let _ = writeln!(
            out,
            "GI levels: low {} | medium {} | high {}",
            self.gi_levels.low, self.gi_levels.medium, self.gi_levels.high
        );
        let _ = writeln!(out, "Reference keywords: {}", self.reference_keywords);
        let _ = writeln!(out, "Synonyms: {}", self.synonyms);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::glycemic::GlycemicTable;
    use crate::import::{run_import, SeedImporter, SeedSet};

    #[test]
    fn test_stats_after_chipotle_seed() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("foods.db")).unwrap();
        db.with_conn(run_migrations).unwrap();

        let table = GlycemicTable::builtin();
        db.with_conn(|conn| table.write_reference_table(conn)).unwrap();
        let mut importer = SeedImporter::new([SeedSet::Chipotle]);
        let summary = run_import(&db, &mut importer, Some(&table)).unwrap();

        let stats = collect_stats(&db).unwrap();
        assert_eq!(stats.total_foods as usize, summary.inserted);
        assert_eq!(stats.by_source.get("restaurant_menu").copied(), Some(stats.total_foods));
        assert_eq!(stats.restaurants, 1);
        assert_eq!(stats.reference_keywords as usize, table.len());
        assert_eq!(
            stats.gi_levels.low + stats.gi_levels.medium + stats.gi_levels.high,
            stats.with_glycemic_index
        );
        assert!(stats.with_glycemic_load <= stats.with_glycemic_index);

        let text = stats.render_text();
        assert!(text.contains("Restaurants: 1"));
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_foods"], serde_json::json!(stats.total_foods));
    }

    #[test]
    fn test_stats_on_empty_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("foods.db")).unwrap();
        db.with_conn(run_migrations).unwrap();

        let stats = collect_stats(&db).unwrap();
        assert_eq!(stats.total_foods, 0);
        assert!(stats.by_source.is_empty());
        assert_eq!(stats.gi_levels, GiLevelCounts::default());
        assert_eq!(stats.synonyms, 0);
    }
}
