//! Food search for spot checks

use serde::Serialize;

use crate::db::{Database, DbResult};
use crate::models::{primary_names, FoodRecord};

/// One search hit
#[derive(Debug, Serialize)]
pub struct FoodSummary {
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub restaurant: Option<String>,
    pub source: String,
    pub serving_size: Option<String>,
    pub nutrient_basis: String,
    pub calories: Option<f64>,
    pub carbs: Option<f64>,
    pub glycemic_index: Option<u8>,
    pub glycemic_load: Option<f64>,
}

impl From<&FoodRecord> for FoodSummary {
    fn from(record: &FoodRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            brand: record.brand.clone(),
            restaurant: record.restaurant.clone(),
            source: record.source.to_string(),
            serving_size: record.serving_size.clone(),
            nutrient_basis: record.nutrient_basis.as_str().to_string(),
            calories: record.nutrients.calories,
            carbs: record.nutrients.total_carbohydrate_g,
            glycemic_index: record.glycemic_index,
            glycemic_load: record.glycemic_load,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchFoodsResponse {
    pub items: Vec<FoodSummary>,
    pub total: usize,
    /// Primary names the query is a synonym of
    pub synonym_of: Vec<String>,
}

impl FoodSummary {
    /// Single-line rendering for terminal output
    pub fn line(&self) -> String {
        let owner = match (&self.restaurant, &self.brand) {
            (Some(r), _) => format!(" @ {}", r),
            (None, Some(b)) => format!(" ({})", b),
            (None, None) => String::new(),
        };
        let show = |v: Option<f64>| v.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string());
        format!(
            "#{} {}{} [{}] kcal={} carbs={} gi={} gl={}",
            self.id,
            self.name,
            owner,
            self.source,
            show(self.calories),
            show(self.carbs),
            self.glycemic_index.map(|i| i.to_string()).unwrap_or_else(|| "-".to_string()),
            show(self.glycemic_load),
        )
    }
}

/// Search by name or search terms, most popular first
pub fn search_foods(db: &Database, query: &str, limit: i64) -> DbResult<SearchFoodsResponse> {
    let limit = limit.clamp(1, 200);
    let (records, synonym_of) = db.with_conn(|conn| {
        Ok((FoodRecord::search(conn, query, limit)?, primary_names(conn, query)?))
    })?;
    let items: Vec<FoodSummary> = records.iter().map(FoodSummary::from).collect();
    let total = items.len();
    Ok(SearchFoodsResponse {
        items,
        total,
        synonym_of,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{write_synonyms, DataSource, FoodCandidate};

    #[test]
    fn test_search_matches_restaurant_terms() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("foods.db")).unwrap();
        db.with_conn(run_migrations).unwrap();
        db.with_conn(|conn| {
            FoodRecord::upsert(
                conn,
                &FoodCandidate::new("Barbacoa", DataSource::RestaurantMenu).with_restaurant("Chipotle"),
                None,
            )?;
            FoodRecord::upsert(conn, &FoodCandidate::new("Kale", DataSource::Manual), None)?;
            Ok(())
        })
        .unwrap();

        let response = search_foods(&db, "chipotle", 0).unwrap();
        assert_eq!(response.total, 1);
        assert!(response.synonym_of.is_empty());
        assert_eq!(response.items[0].name, "Barbacoa");
        assert_eq!(
            response.items[0].line(),
            format!("#{} Barbacoa @ Chipotle [restaurant_menu] kcal=- carbs=- gi=- gl=-", response.items[0].id)
        );
    }

    #[test]
    fn test_search_reports_synonym_targets() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("foods.db")).unwrap();
        db.with_conn(run_migrations).unwrap();
        db.with_conn(|conn| {
            write_synonyms(conn)?;
            FoodRecord::upsert(conn, &FoodCandidate::new("Broccoli", DataSource::Manual), None)?;
            Ok(())
        })
        .unwrap();

        let response = search_foods(&db, "brocolli", 20).unwrap();
        assert_eq!(response.synonym_of, vec!["Broccoli"]);
        assert_eq!(response.total, 1);
        assert_eq!(response.items[0].name, "Broccoli");
    }
}
