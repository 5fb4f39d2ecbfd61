//! Food record model
//!
//! One stored nutritional fact for a specific food preparation, plus the
//! upsert that reconciles import candidates against the store.

use std::fmt;
use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::candidate::{search_terms, FoodCandidate, Identity};
use super::Nutrients;
use crate::db::{DbError, DbResult};
use crate::glycemic::{calculate_gl, GlycemicTable};

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Manual,
    UsdaFoundation,
    UsdaBranded,
    OpenFoodFacts,
    RestaurantMenu,
    International,
}

impl DataSource {
    pub const ALL: [DataSource; 6] = [
        DataSource::Manual,
        DataSource::UsdaFoundation,
        DataSource::UsdaBranded,
        DataSource::OpenFoodFacts,
        DataSource::RestaurantMenu,
        DataSource::International,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Manual => "manual",
            DataSource::UsdaFoundation => "usda_foundation",
            DataSource::UsdaBranded => "usda_branded",
            DataSource::OpenFoodFacts => "open_food_facts",
            DataSource::RestaurantMenu => "restaurant_menu",
            DataSource::International => "international",
        }
    }

    /// Basis used when a candidate does not state one
    pub fn default_basis(&self) -> NutrientBasis {
        match self {
            DataSource::Manual | DataSource::RestaurantMenu => NutrientBasis::PerServing,
            DataSource::UsdaFoundation
            | DataSource::UsdaBranded
            | DataSource::OpenFoodFacts
            | DataSource::International => NutrientBasis::Per100g,
        }
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "manual" => Ok(DataSource::Manual),
            "usda_foundation" | "usda" => Ok(DataSource::UsdaFoundation),
            "usda_branded" => Ok(DataSource::UsdaBranded),
            "open_food_facts" | "openfoodfacts" | "off" => Ok(DataSource::OpenFoodFacts),
            "restaurant_menu" | "restaurant" => Ok(DataSource::RestaurantMenu),
            "international" => Ok(DataSource::International),
            other => Err(format!("unknown data source '{}'", other)),
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a row's nutrient values are normalized to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NutrientBasis {
    #[serde(rename = "per_serving")]
    PerServing,
    #[serde(rename = "per_100g")]
    Per100g,
}

impl NutrientBasis {
    pub const ALL: [NutrientBasis; 2] = [NutrientBasis::PerServing, NutrientBasis::Per100g];

    pub fn as_str(&self) -> &'static str {
        match self {
            NutrientBasis::PerServing => "per_serving",
            NutrientBasis::Per100g => "per_100g",
        }
    }
}

impl FromStr for NutrientBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per_serving" | "serving" => Ok(NutrientBasis::PerServing),
            "per_100g" | "100g" => Ok(NutrientBasis::Per100g),
            other => Err(format!("unknown nutrient basis '{}'", other)),
        }
    }
}

/// Result of merging one candidate into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(i64),
    Updated(i64),
    /// Identity existed and the merge changed nothing
    Unchanged(i64),
    /// No identity possible (blank name)
    Rejected,
}

/// A stored food record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodRecord {
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub restaurant: Option<String>,
    pub source: DataSource,
    pub external_id: Option<String>,
    pub category: Option<String>,
    pub serving_size: Option<String>,
    pub serving_size_grams: Option<f64>,
    pub nutrient_basis: NutrientBasis,
    pub nutrients: Nutrients,
    pub glycemic_index: Option<u8>,
    pub glycemic_load: Option<f64>,
    pub search_terms: String,
    pub popularity_score: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Columns written by insert/update, nutrients excluded
const META_COLUMNS: [&str; 13] = [
    "name",
    "brand",
    "restaurant",
    "source",
    "external_id",
    "category",
    "serving_size",
    "serving_size_grams",
    "nutrient_basis",
    "glycemic_index",
    "glycemic_load",
    "search_terms",
    "popularity_score",
];

impl FoodRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let source: String = row.get("source")?;
        let basis: String = row.get("nutrient_basis")?;
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            brand: row.get("brand")?,
            restaurant: row.get("restaurant")?,
            source: source.parse().map_err(|e: String| invalid_column("source", e))?,
            external_id: row.get("external_id")?,
            category: row.get("category")?,
            serving_size: row.get("serving_size")?,
            serving_size_grams: row.get("serving_size_grams")?,
            nutrient_basis: basis.parse().map_err(|e: String| invalid_column("nutrient_basis", e))?,
            nutrients: Nutrients::from_row(row)?,
            glycemic_index: row.get("glycemic_index")?,
            glycemic_load: row.get("glycemic_load")?,
            search_terms: row.get("search_terms")?,
            popularity_score: row.get("popularity_score")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Fresh, unsaved record from a normalized candidate
    fn from_candidate(candidate: &FoodCandidate) -> Self {
        let terms = search_terms(
            &candidate.name,
            candidate.brand.as_deref(),
            candidate.restaurant.as_deref(),
        );
        Self {
            id: 0,
            name: candidate.name.clone(),
            brand: candidate.brand.clone(),
            restaurant: candidate.restaurant.clone(),
            source: candidate.source,
            external_id: candidate.external_id.clone(),
            category: candidate.category.clone(),
            serving_size: candidate.serving_size.clone(),
            serving_size_grams: candidate.serving_size_grams,
            nutrient_basis: candidate
                .nutrient_basis
                .unwrap_or_else(|| candidate.source.default_basis()),
            nutrients: candidate.nutrients.clone(),
            glycemic_index: candidate.glycemic_index,
            glycemic_load: candidate.glycemic_load,
            search_terms: terms,
            popularity_score: 0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    /// Overwrite every field the candidate reports; leave the rest alone
    fn merge(&mut self, candidate: &FoodCandidate) {
        fn take<T: Clone>(slot: &mut Option<T>, incoming: &Option<T>) {
            if incoming.is_some() {
                slot.clone_from(incoming);
            }
        }

        let identity_before = (self.name.clone(), self.brand.clone(), self.restaurant.clone());

        self.name.clone_from(&candidate.name);
        take(&mut self.brand, &candidate.brand);
        take(&mut self.restaurant, &candidate.restaurant);
        take(&mut self.external_id, &candidate.external_id);
        take(&mut self.category, &candidate.category);
        take(&mut self.serving_size, &candidate.serving_size);
        take(&mut self.serving_size_grams, &candidate.serving_size_grams);
        take(&mut self.glycemic_index, &candidate.glycemic_index);
        take(&mut self.glycemic_load, &candidate.glycemic_load);
        if let Some(basis) = candidate.nutrient_basis {
            self.nutrient_basis = basis;
        }
        self.nutrients.merge_from(&candidate.nutrients);

        let identity_after = (self.name.clone(), self.brand.clone(), self.restaurant.clone());
        if identity_before != identity_after || self.search_terms.is_empty() {
            self.search_terms = search_terms(
                &self.name,
                self.brand.as_deref(),
                self.restaurant.as_deref(),
            );
        }
    }

    /// Carbohydrate grams in one serving
    ///
    /// Per-100g rows only qualify when the serving weight is known.
    pub fn carbs_per_serving(&self) -> Option<f64> {
        let carbs = self.nutrients.total_carbohydrate_g?;
        match self.nutrient_basis {
            NutrientBasis::PerServing => Some(carbs),
            NutrientBasis::Per100g => self.serving_size_grams.map(|grams| carbs * grams / 100.0),
        }
    }

    /// Fill in a missing glycemic index and re-derive the load
    ///
    /// The load is recomputed whenever index and per-serving carbs are both
    /// known; a stored load is kept only when it cannot be derived.
    pub fn annotate_glycemic(&mut self, table: Option<&GlycemicTable>) {
        if self.glycemic_index.is_none() {
            if let Some(table) = table {
                self.glycemic_index = table.estimate(&self.name);
            }
        }

        if let Some(load) = calculate_gl(self.glycemic_index, self.carbs_per_serving()) {
            self.glycemic_load = Some(load);
        }
    }

    /// Merge a candidate into the store
    ///
    /// Looks the identity tuple up; inserts when absent, otherwise overwrites
    /// only the fields the candidate carries. A merge that changes nothing
    /// leaves the row (including `updated_at`) untouched.
    pub fn upsert(
        conn: &Connection,
        candidate: &FoodCandidate,
        glycemic: Option<&GlycemicTable>,
    ) -> DbResult<UpsertOutcome> {
        let candidate = candidate.clone().normalized();
        let Some(identity) = candidate.identity() else {
            error!(source = %candidate.source, "rejecting candidate without a name");
            return Ok(UpsertOutcome::Rejected);
        };

        match Self::find_by_identity(conn, &identity)? {
            None => {
                let mut record = Self::from_candidate(&candidate);
                record.annotate_glycemic(glycemic);
                let id = record.insert(conn)?;
                debug!(id, name = %record.name, source = %record.source, "inserted food");
                Ok(UpsertOutcome::Inserted(id))
            }
            Some(existing) => {
                let mut merged = existing.clone();
                merged.merge(&candidate);
                merged.annotate_glycemic(glycemic);

                if merged == existing {
                    debug!(id = existing.id, name = %existing.name, "food unchanged");
                    return Ok(UpsertOutcome::Unchanged(existing.id));
                }

                merged.write_update(conn)?;
                debug!(id = existing.id, name = %merged.name, "updated food");
                Ok(UpsertOutcome::Updated(existing.id))
            }
        }
    }

    fn column_values(&self) -> Vec<Box<dyn ToSql>> {
        let mut values: Vec<Box<dyn ToSql>> = vec![
            Box::new(self.name.clone()),
            Box::new(self.brand.clone()),
            Box::new(self.restaurant.clone()),
            Box::new(self.source.as_str()),
            Box::new(self.external_id.clone()),
            Box::new(self.category.clone()),
            Box::new(self.serving_size.clone()),
            Box::new(self.serving_size_grams),
            Box::new(self.nutrient_basis.as_str()),
            Box::new(self.glycemic_index),
            Box::new(self.glycemic_load),
            Box::new(self.search_terms.clone()),
            Box::new(self.popularity_score),
        ];
        for value in self.nutrients.values() {
            values.push(Box::new(value));
        }
        values
    }

    fn all_columns() -> impl Iterator<Item = &'static str> {
        META_COLUMNS.iter().chain(Nutrients::COLUMNS.iter()).copied()
    }

    fn insert(&self, conn: &Connection) -> DbResult<i64> {
        let columns: Vec<&str> = Self::all_columns().collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO foods ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        let values = self.column_values();
        let params_refs: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;
        Ok(conn.last_insert_rowid())
    }

    fn write_update(&self, conn: &Connection) -> DbResult<()> {
        let mut updates: Vec<String> = Self::all_columns()
            .enumerate()
            .map(|(i, col)| format!("{} = ?{}", col, i + 1))
            .collect();
        updates.push("updated_at = datetime('now')".to_string());

        let mut values = self.column_values();
        let sql = format!(
            "UPDATE foods SET {} WHERE id = ?{}",
            updates.join(", "),
            values.len() + 1
        );
        values.push(Box::new(self.id));

        let params_refs: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;
        Ok(())
    }

    /// Store a new glycemic index / load pair for a row
    pub fn set_glycemic(
        conn: &Connection,
        id: i64,
        glycemic_index: Option<u8>,
        glycemic_load: Option<f64>,
    ) -> DbResult<()> {
        conn.execute(
            "UPDATE foods SET glycemic_index = ?1, glycemic_load = ?2, updated_at = datetime('now')
             WHERE id = ?3",
            params![glycemic_index, glycemic_load, id],
        )?;
        Ok(())
    }

    /// Look a record up by its identity tuple
    pub fn find_by_identity(conn: &Connection, identity: &Identity) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM foods
             WHERE name = ?1 AND brand IS ?2 AND restaurant IS ?3 AND source = ?4",
        )?;
        let record = stmt
            .query_row(
                params![
                    identity.name,
                    identity.brand,
                    identity.restaurant,
                    identity.source.as_str()
                ],
                Self::from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Get a record by id
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM foods WHERE id = ?1")?;
        Ok(stmt.query_row([id], Self::from_row).optional()?)
    }

    /// Search by name or search terms
    pub fn search(conn: &Connection, query: &str, limit: i64) -> DbResult<Vec<Self>> {
        let term = query.trim().to_lowercase();
        let pattern = format!("%{}%", term);
        // An exact synonym also matches foods named after its primary name
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM foods
            WHERE LOWER(name) LIKE ?1 OR search_terms LIKE ?1
               OR EXISTS (
                   SELECT 1 FROM food_synonyms s
                   WHERE s.synonym = ?3
                     AND LOWER(foods.name) LIKE '%' || LOWER(s.primary_name) || '%'
               )
            ORDER BY popularity_score DESC, name ASC
            LIMIT ?2
            "#,
        )?;

        let items = stmt
            .query_map(params![pattern, limit, term], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Records that have no glycemic index yet
    pub fn list_missing_glycemic_index(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt =
            conn.prepare("SELECT * FROM foods WHERE glycemic_index IS NULL ORDER BY id")?;
        let items = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Records with an index but no load
    pub fn list_missing_glycemic_load(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM foods
             WHERE glycemic_index IS NOT NULL AND glycemic_load IS NULL
             ORDER BY id",
        )?;
        let items = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Count all records
    pub fn count(conn: &Connection) -> DbResult<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))?)
    }

    /// Count records for one source
    pub fn count_by_source(conn: &Connection, source: DataSource) -> DbResult<i64> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM foods WHERE source = ?1",
            [source.as_str()],
            |row| row.get(0),
        )?)
    }
}

fn invalid_column(column: &'static str, value: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(DbError::InvalidValue { column, value }),
    )
}
