//! Importers
//!
//! Every importer hands out batches of candidates. `run_import` upserts each
//! batch inside one transaction, so a failing batch rolls back on its own and
//! batches committed before it stay intact.

pub mod csv_file;
pub mod json_file;
pub mod openfoodfacts;
pub mod seed;
pub mod usda;

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::db::{Database, DbError};
use crate::glycemic::GlycemicTable;
use crate::models::{FoodCandidate, FoodRecord, UpsertOutcome};

pub use csv_file::CsvImporter;
pub use json_file::JsonImporter;
pub use openfoodfacts::OpenFoodFactsImporter;
pub use seed::{SeedImporter, SeedSet};
pub use usda::UsdaImporter;

/// Import error types
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    Invalid(String),
}

/// Candidates that are written together or not at all
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    /// Short description for logs ("Chipotle", "page 3", "rows 1-500")
    pub label: String,
    pub candidates: Vec<FoodCandidate>,
}

impl ImportBatch {
    pub fn new(label: impl Into<String>, candidates: Vec<FoodCandidate>) -> Self {
        Self {
            label: label.into(),
            candidates,
        }
    }
}

/// A source of candidate batches
pub trait Importer {
    /// Importer name for logs
    fn name(&self) -> &str;

    /// Next batch, or `None` when the source is exhausted
    ///
    /// Recoverable per-item problems (bad rows, failed fetches) are logged and
    /// skipped inside the importer; an `Err` ends the import.
    fn next_batch(&mut self) -> Result<Option<ImportBatch>, ImportError>;
}

/// Tally of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub batches: usize,
    pub failed_batches: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub rejected: usize,
}

impl ImportSummary {
    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted(_) => self.inserted += 1,
            UpsertOutcome::Updated(_) => self.updated += 1,
            UpsertOutcome::Unchanged(_) => self.unchanged += 1,
            UpsertOutcome::Rejected => self.rejected += 1,
        }
    }

    fn absorb(&mut self, other: &ImportSummary) {
        self.batches += other.batches;
        self.failed_batches += other.failed_batches;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.rejected += other.rejected;
    }

    /// Rows written (inserted or updated)
    pub fn written(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Upsert a single batch inside one transaction
pub fn import_batch(
    db: &Database,
    batch: &ImportBatch,
    glycemic: Option<&GlycemicTable>,
) -> Result<ImportSummary, DbError> {
    db.with_transaction(|tx| {
        let mut tally = ImportSummary {
            batches: 1,
            ..Default::default()
        };
        for candidate in &batch.candidates {
            tally.record(FoodRecord::upsert(tx, candidate, glycemic)?);
        }
        Ok(tally)
    })
}

/// Drain an importer into the database
pub fn run_import(
    db: &Database,
    importer: &mut dyn Importer,
    glycemic: Option<&GlycemicTable>,
) -> Result<ImportSummary, ImportError> {
    let name = importer.name().to_string();
    info!(importer = %name, "starting import");

    let mut summary = ImportSummary::default();
    while let Some(batch) = importer.next_batch()? {
        if batch.candidates.is_empty() {
            debug!(importer = %name, batch = %batch.label, "skipping empty batch");
            continue;
        }

        match import_batch(db, &batch, glycemic) {
            Ok(tally) => {
                info!(
                    importer = %name,
                    batch = %batch.label,
                    inserted = tally.inserted,
                    updated = tally.updated,
                    unchanged = tally.unchanged,
                    rejected = tally.rejected,
                    "batch committed"
                );
                summary.absorb(&tally);
            }
            Err(e) => {
                error!(importer = %name, batch = %batch.label, "batch rolled back: {}", e);
                summary.failed_batches += 1;
            }
        }
    }

    info!(
        importer = %name,
        batches = summary.batches,
        failed = summary.failed_batches,
        inserted = summary.inserted,
        updated = summary.updated,
        unchanged = summary.unchanged,
        rejected = summary.rejected,
        "import finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::DataSource;
    use crate::nutrients;

    /// Hands out prepared batches in order
    struct VecImporter(std::vec::IntoIter<ImportBatch>);

    impl VecImporter {
        fn new(batches: Vec<ImportBatch>) -> Self {
            Self(batches.into_iter())
        }
    }

    impl Importer for VecImporter {
        fn name(&self) -> &str {
            "test"
        }

        fn next_batch(&mut self) -> Result<Option<ImportBatch>, ImportError> {
            Ok(self.0.next())
        }
    }

    fn open_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("foods.db")).unwrap();
        db.with_conn(run_migrations).unwrap();
        (dir, db)
    }

    fn chipotle(name: &str, calories: f64) -> FoodCandidate {
        FoodCandidate::new(name, DataSource::RestaurantMenu)
            .with_restaurant("Chipotle")
            .with_nutrients(nutrients!(calories: calories))
    }

    #[test]
    fn test_three_chipotle_items_into_empty_store() {
        let (_dir, db) = open_db();
        let batch = ImportBatch::new(
            "Chipotle",
            vec![
                chipotle("Barbacoa", 170.0),
                chipotle("Chicken", 180.0),
                chipotle("Carnitas", 210.0),
            ],
        );

        let summary = run_import(&db, &mut VecImporter::new(vec![batch]), None).unwrap();
        assert_eq!(summary.inserted, 3);

        let rows: Vec<(String, String)> = db
            .with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT source, restaurant FROM foods")?;
                let rows = stmt
                    .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .unwrap();
        assert_eq!(rows.len(), 3);
        for (source, restaurant) in rows {
            assert_eq!(source, "restaurant_menu");
            assert_eq!(restaurant, "Chipotle");
        }
    }

    #[test]
    fn test_failing_batch_rolls_back_alone() {
        let (_dir, db) = open_db();

        let mut bad = chipotle("Broken", 1.0);
        bad.glycemic_index = Some(150);

        let batches = vec![
            ImportBatch::new("first", vec![chipotle("Steak", 150.0), chipotle("Sofritas", 150.0)]),
            ImportBatch::new("second", vec![chipotle("Cheese", 110.0), bad]),
            ImportBatch::new("third", vec![chipotle("Sour Cream", 110.0)]),
        ];

        let summary = run_import(&db, &mut VecImporter::new(batches), None).unwrap();
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.failed_batches, 1);
        assert_eq!(summary.inserted, 3);

        let count = db.with_conn(|conn| FoodRecord::count(conn)).unwrap();
        assert_eq!(count, 3);
        let cheese = db
            .with_conn(|conn| FoodRecord::search(conn, "cheese", 5))
            .unwrap();
        assert!(cheese.is_empty());
    }

    #[test]
    fn test_rejected_candidates_do_not_fail_batch() {
        let (_dir, db) = open_db();
        let batch = ImportBatch::new(
            "mixed",
            vec![chipotle("Guacamole (large)", 460.0), chipotle("   ", 1.0)],
        );

        let summary = run_import(&db, &mut VecImporter::new(vec![batch]), None).unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.failed_batches, 0);
    }
}
