//! Glycemic backfill
//!
//! Fills glycemic index and load on rows that were stored without them,
//! e.g. rows imported before the keyword table grew, or with GI disabled.

use serde::Serialize;
use tracing::{debug, info};

use crate::db::{Database, DbResult};
use crate::glycemic::{calculate_gl, GlycemicTable};
use crate::models::FoodRecord;

/// Result of a backfill pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillSummary {
    /// Rows that had no glycemic index
    pub missing_index: usize,
    /// Rows that received an estimated index
    pub index_set: usize,
    /// Rows that received a load (either pass)
    pub load_set: usize,
    /// Rows whose name matched nothing in the table
    pub unmatched: usize,
}

/// Estimate missing indexes, then derive missing loads
///
/// Runs as one transaction. An index of 0 is a stored value, not a gap.
pub fn backfill_glycemic(db: &Database, table: &GlycemicTable) -> DbResult<BackfillSummary> {
    let summary = db.with_transaction(|tx| {
        let mut summary = BackfillSummary::default();

        let missing = FoodRecord::list_missing_glycemic_index(tx)?;
        summary.missing_index = missing.len();
        for record in missing {
            let mut annotated = record.clone();
            annotated.annotate_glycemic(Some(table));
            let Some(index) = annotated.glycemic_index else {
                summary.unmatched += 1;
                continue;
            };

            FoodRecord::set_glycemic(tx, record.id, Some(index), annotated.glycemic_load)?;
            summary.index_set += 1;
            if annotated.glycemic_load.is_some() {
                summary.load_set += 1;
            }
            debug!(id = record.id, name = %record.name, index, "estimated glycemic index");
        }

        for record in FoodRecord::list_missing_glycemic_load(tx)? {
            if let Some(load) = calculate_gl(record.glycemic_index, record.carbs_per_serving()) {
                FoodRecord::set_glycemic(tx, record.id, record.glycemic_index, Some(load))?;
                summary.load_set += 1;
                debug!(id = record.id, name = %record.name, load, "derived glycemic load");
            }
        }

        Ok(summary)
    })?;

    info!(
        missing = summary.missing_index,
        index_set = summary.index_set,
        load_set = summary.load_set,
        unmatched = summary.unmatched,
        "glycemic backfill finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{DataSource, FoodCandidate, NutrientBasis};
    use crate::nutrients;

    fn setup() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("foods.db")).unwrap();
        db.with_conn(run_migrations).unwrap();
        (dir, db)
    }

    fn store(db: &Database, candidate: FoodCandidate) -> i64 {
        match db.with_conn(|conn| FoodRecord::upsert(conn, &candidate, None)).unwrap() {
            crate::models::UpsertOutcome::Inserted(id) => id,
            other => panic!("expected insert, got {:?}", other),
        }
    }

    fn fetch(db: &Database, id: i64) -> FoodRecord {
        db.with_conn(|conn| FoodRecord::get_by_id(conn, id)).unwrap().unwrap()
    }

    #[test]
    fn test_backfill_estimates_index_and_load() {
        let (_dir, db) = setup();
        let taco = store(
            &db,
            FoodCandidate::new("Taco", DataSource::Manual)
                .with_basis(NutrientBasis::PerServing)
                .with_nutrients(nutrients!(total_carbohydrate_g: 20)),
        );
        let unknown = store(&db, FoodCandidate::new("Qwxyz", DataSource::Manual));

        let table = GlycemicTable::builtin();
        let summary = backfill_glycemic(&db, &table).unwrap();
        assert_eq!(summary.missing_index, 2);
        assert_eq!(summary.index_set, 1);
        assert_eq!(summary.load_set, 1);
        assert_eq!(summary.unmatched, 1);

        let taco = fetch(&db, taco);
        assert_eq!(taco.glycemic_index, Some(52));
        assert_eq!(taco.glycemic_load, Some(10.4));
        assert_eq!(fetch(&db, unknown).glycemic_index, None);

        // A second pass finds nothing new to do
        let again = backfill_glycemic(&db, &table).unwrap();
        assert_eq!(again.index_set, 0);
        assert_eq!(again.load_set, 0);
    }

    #[test]
    fn test_backfill_derives_load_once_carbs_arrive() {
        let (_dir, db) = setup();
        let mut candidate = FoodCandidate::new("Mystery Grain Bowl", DataSource::Manual)
            .with_basis(NutrientBasis::PerServing);
        candidate.glycemic_index = Some(40);
        let id = store(&db, candidate);
        assert_eq!(fetch(&db, id).glycemic_load, None);

        db.with_conn(|conn| {
            conn.execute("UPDATE foods SET total_carbohydrate_g = 30 WHERE id = ?1", [id])?;
            Ok(())
        })
        .unwrap();

        let summary = backfill_glycemic(&db, &GlycemicTable::builtin()).unwrap();
        assert_eq!(summary.missing_index, 0);
        assert_eq!(summary.load_set, 1);

        let record = fetch(&db, id);
        assert_eq!(record.glycemic_index, Some(40));
        assert_eq!(record.glycemic_load, Some(12.0));
    }

    #[test]
    fn test_zero_index_is_not_missing() {
        let (_dir, db) = setup();
        let mut candidate = FoodCandidate::new("Pasta Primavera", DataSource::Manual)
            .with_basis(NutrientBasis::PerServing);
        candidate.glycemic_index = Some(0);
        let id = store(&db, candidate);

        let summary = backfill_glycemic(&db, &GlycemicTable::builtin()).unwrap();
        assert_eq!(summary.missing_index, 0);
        assert_eq!(fetch(&db, id).glycemic_index, Some(0));
    }
}
