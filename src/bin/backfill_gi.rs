//! Fill missing glycemic index / load values in an existing database
//! Usage: cargo run --bin backfill_gi -- [db_path]
//!
//! Honours `NUTRISEED_CONFIG` for glycemic overrides, like `nutriseed`.

use std::path::PathBuf;

use nutriseed::config::Config;
use nutriseed::db::{migrations, Database};
use nutriseed::tools::backfill_glycemic;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env(std::env::args().nth(1).map(PathBuf::from), |key| {
        std::env::var(key).ok()
    })?;
    let db_path = config.database_path.clone();
    if !db_path.exists() {
        eprintln!("No database at {}", db_path.display());
        std::process::exit(1);
    }
    println!("Database: {}", db_path.display());

    let database = Database::open(&db_path)?;
    database.with_conn(|conn| {
        migrations::run_migrations(conn)?;
        Ok(())
    })?;

    let table = config.glycemic_table()?;
    let summary = backfill_glycemic(&database, &table)?;

    println!("Rows without an index: {}", summary.missing_index);
    println!("  Estimated: {}", summary.index_set);
    println!("  No keyword match: {}", summary.unmatched);
    println!("Glycemic loads set: {}", summary.load_set);

    database.close();
    Ok(())
}
