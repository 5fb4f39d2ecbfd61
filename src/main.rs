//! nutriseed
//!
//! Command-line builder for the bundled nutrition database.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nutriseed::build_info;
use nutriseed::config::{self, Config};
use nutriseed::db::{self, Database};
use nutriseed::glycemic::{estimate_match, GlycemicTable};
use nutriseed::import::{
    self, CsvImporter, Importer, JsonImporter, OpenFoodFactsImporter, SeedImporter,
    SeedSet, UsdaImporter,
};
use nutriseed::models::{write_synonyms, DataSource};
use nutriseed::tools;

#[derive(Parser, Debug)]
#[command(name = "nutriseed", version, about = "Build the bundled nutrition database")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = config::ENV_CONFIG)]
    config: Option<PathBuf>,

    /// SQLite file to build (overrides the config file)
    #[arg(long, global = true, env = config::ENV_DATABASE_PATH)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the schema and write the glycemic reference table
    Init,
    /// Load the built-in seed lists
    Seed {
        /// Seed sets to load (default: all)
        #[arg(long = "set", value_enum)]
        sets: Vec<SeedArg>,
    },
    /// Import a JSON seed file (restaurant map or flat array)
    ImportJson {
        file: PathBuf,
        #[arg(long, default_value = "restaurant_menu", value_parser = parse_source)]
        source: DataSource,
    },
    /// Import a CSV file with a header row
    ImportCsv {
        file: PathBuf,
        #[arg(long, value_parser = parse_source)]
        source: DataSource,
        #[arg(long, default_value_t = import::csv_file::DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
    /// Import from USDA FoodData Central
    ImportUsda,
    /// Import from OpenFoodFacts
    ImportOff,
    /// Estimate missing glycemic index and load values
    BackfillGi,
    /// Score popularity, then VACUUM and ANALYZE
    Optimize,
    /// Print database statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Search foods by name, brand or restaurant
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show the glycemic index estimate for food names
    EstimateGi {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SeedArg {
    Manual,
    International,
    Chipotle,
    Restaurants,
    MoreRestaurants,
}

impl From<SeedArg> for SeedSet {
    fn from(arg: SeedArg) -> Self {
        match arg {
            SeedArg::Manual => SeedSet::Manual,
            SeedArg::International => SeedSet::International,
            SeedArg::Chipotle => SeedSet::Chipotle,
            SeedArg::Restaurants => SeedSet::Restaurants,
            SeedArg::MoreRestaurants => SeedSet::MoreRestaurants,
        }
    }
}

fn parse_source(s: &str) -> Result<DataSource, String> {
    s.parse()
}

fn open_database(path: &Path) -> Result<Database, Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    eprintln!("Database path: {}", path.display());
    let database = Database::open(path)?;
    database.with_conn(|conn| {
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;
    Ok(database)
}

fn run_importer(
    database: &Database,
    importer: &mut dyn Importer,
    table: &GlycemicTable,
) -> Result<(), Box<dyn std::error::Error>> {
    let summary = import::run_import(database, importer, Some(table))?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Reference tables shipped alongside the foods
fn write_reference_data(database: &Database, table: &GlycemicTable) -> Result<(), Box<dyn std::error::Error>> {
    let (keywords, synonyms) = database.with_transaction(|tx| {
        Ok((table.write_reference_table(tx)?, write_synonyms(tx)?))
    })?;
    info!(keywords, synonyms, "reference tables written");
    Ok(())
}

/// Opens the database on first use; `estimate-gi` never touches it
struct LazyDatabase {
    path: PathBuf,
    database: Option<Database>,
}

impl LazyDatabase {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            database: None,
        }
    }

    fn get(&mut self) -> Result<&Database, Box<dyn std::error::Error>> {
        let database = match self.database.take() {
            Some(database) => database,
            None => open_database(&self.path)?,
        };
        Ok(&*self.database.insert(database))
    }

    fn close(self) {
        if let Some(database) = self.database {
            database.close();
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::resolve(cli.config.as_deref(), cli.database.clone(), |key| {
        std::env::var(key).ok()
    })?;
    let table = config.glycemic_table()?;
    let mut database = LazyDatabase::new(&config.database_path);

    match cli.command {
        Command::EstimateGi { names } => {
            for name in &names {
                match estimate_match(&table, name) {
                    Some(m) => println!("{}: {} ({} match on '{}')", name, m.index, m.stage, m.keyword),
                    None => println!("{}: unknown", name),
                }
            }
        }
        Command::Init => write_reference_data(database.get()?, &table)?,
        Command::Seed { sets } => {
            let db = database.get()?;
            write_reference_data(db, &table)?;
            let mut importer = if sets.is_empty() {
                SeedImporter::all()
            } else {
                SeedImporter::new(sets.into_iter().map(SeedSet::from))
            };
            run_importer(db, &mut importer, &table)?;
        }
        Command::ImportJson { file, source } => {
            let mut importer = JsonImporter::open(&file, source)?;
            run_importer(database.get()?, &mut importer, &table)?;
        }
        Command::ImportCsv {
            file,
            source,
            batch_size,
        } => {
            let mut importer = CsvImporter::open(&file, source, batch_size)?;
            run_importer(database.get()?, &mut importer, &table)?;
        }
        Command::ImportUsda => {
            let mut importer = UsdaImporter::new(&config.usda)?;
            run_importer(database.get()?, &mut importer, &table)?;
        }
        Command::ImportOff => {
            let mut importer = OpenFoodFactsImporter::new(&config.openfoodfacts)?;
            run_importer(database.get()?, &mut importer, &table)?;
        }
        Command::BackfillGi => {
            let summary = tools::backfill_glycemic(database.get()?, &table)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Optimize => {
            let summary = tools::optimize(database.get()?)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Stats { json } => {
            let stats = tools::collect_stats(database.get()?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", stats.render_text());
            }
        }
        Command::Search { query, limit } => {
            let response = tools::search_foods(database.get()?, &query, limit)?;
            if !response.synonym_of.is_empty() {
                eprintln!("'{}' is a synonym of: {}", query, response.synonym_of.join(", "));
            }
            for item in &response.items {
                println!("{}", item.line());
            }
            eprintln!("{} result(s)", response.total);
        }
    }

    database.close();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nutriseed=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    build_info::print_startup_banner();
    run(cli)
}
