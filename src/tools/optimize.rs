//! Popularity scoring and file compaction
//!
//! Run once after all imports, before the file is bundled.

use serde::Serialize;
use tracing::info;

use crate::db::{Database, DbResult};

/// Everyday foods that should rank first in app search
pub const POPULAR_TERMS: &[&str] = &[
    "pizza", "burger", "fries", "chicken", "salad", "sandwich", "pasta", "rice", "bread", "milk",
    "cheese", "eggs", "apple", "banana", "coffee", "water", "soda", "juice",
];

/// Points per popular term found in a food name
pub const POPULARITY_POINTS: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizeSummary {
    /// Rows that ended with a non-zero score
    pub scored_rows: i64,
    pub total_rows: i64,
}

/// Reset every score and re-add points per matching term
///
/// Scores are rebuilt from zero, so repeated runs give the same result.
pub fn recompute_popularity(db: &Database) -> DbResult<i64> {
    db.with_transaction(|tx| {
        tx.execute("UPDATE foods SET popularity_score = 0", [])?;
        let mut stmt = tx.prepare(
            "UPDATE foods SET popularity_score = popularity_score + ?1 WHERE LOWER(name) LIKE ?2",
        )?;
        for term in POPULAR_TERMS {
            stmt.execute(rusqlite::params![POPULARITY_POINTS, format!("%{}%", term)])?;
        }
        Ok(tx.query_row(
            "SELECT COUNT(*) FROM foods WHERE popularity_score > 0",
            [],
            |row| row.get(0),
        )?)
    })
}

/// Score popularity, then VACUUM and ANALYZE
///
/// VACUUM cannot run inside a transaction, so it goes through a plain
/// connection after the scoring commit.
pub fn optimize(db: &Database) -> DbResult<OptimizeSummary> {
    let scored_rows = recompute_popularity(db)?;
    info!(scored_rows, "popularity scores updated");

    let total_rows = db.with_conn(|conn| {
        conn.execute_batch("VACUUM; ANALYZE;")?;
        Ok(conn.query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))?)
    })?;
    info!(path = %db.path().display(), "database vacuumed and analyzed");

    Ok(OptimizeSummary {
        scored_rows,
        total_rows,
    })
}
