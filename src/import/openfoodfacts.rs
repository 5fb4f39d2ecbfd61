//! OpenFoodFacts importer
//!
//! Searches each configured category by popularity, then fetches the
//! configured barcodes one by one. Values come from the `*_100g` nutriments;
//! OpenFoodFacts reports minerals and vitamins in grams, so they are scaled
//! into the stored mg/mcg columns.

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{ImportBatch, ImportError, Importer};
use crate::config::OpenFoodFactsConfig;
use crate::models::{parse_number, DataSource, FoodCandidate, NutrientBasis, Nutrients};

const G_TO_MG: f64 = 1_000.0;
const G_TO_MCG: f64 = 1_000_000.0;

/// Nutriment key → stored column, with a multiplier into the column's unit
const NUTRIMENT_MAP: &[(&str, &str, f64)] = &[
    ("energy-kcal_100g", "calories", 1.0),
    ("fat_100g", "total_fat_g", 1.0),
    ("saturated-fat_100g", "saturated_fat_g", 1.0),
    ("trans-fat_100g", "trans_fat_g", 1.0),
    ("cholesterol_100g", "cholesterol_mg", G_TO_MG),
    ("sodium_100g", "sodium_mg", G_TO_MG),
    ("carbohydrates_100g", "total_carbohydrate_g", 1.0),
    ("fiber_100g", "dietary_fiber_g", 1.0),
    ("sugars_100g", "sugars_g", 1.0),
    ("proteins_100g", "protein_g", 1.0),
    ("vitamin-a_100g", "vitamin_a_mcg_rae", G_TO_MCG),
    ("vitamin-c_100g", "vitamin_c_mg", G_TO_MG),
    ("vitamin-d_100g", "vitamin_d_mcg", G_TO_MCG),
    ("vitamin-e_100g", "vitamin_e_mg", G_TO_MG),
    ("vitamin-k_100g", "vitamin_k_mcg", G_TO_MCG),
    ("vitamin-b1_100g", "thiamin_mg", G_TO_MG),
    ("vitamin-b2_100g", "riboflavin_mg", G_TO_MG),
    ("vitamin-pp_100g", "niacin_mg", G_TO_MG),
    ("vitamin-b6_100g", "vitamin_b6_mg", G_TO_MG),
    ("vitamin-b9_100g", "folate_mcg", G_TO_MCG),
    ("vitamin-b12_100g", "vitamin_b12_mcg", G_TO_MCG),
    ("calcium_100g", "calcium_mg", G_TO_MG),
    ("iron_100g", "iron_mg", G_TO_MG),
    ("magnesium_100g", "magnesium_mg", G_TO_MG),
    ("phosphorus_100g", "phosphorus_mg", G_TO_MG),
    ("potassium_100g", "potassium_mg", G_TO_MG),
    ("zinc_100g", "zinc_mg", G_TO_MG),
    ("caffeine_100g", "caffeine_mg", G_TO_MG),
    ("alcohol_100g", "alcohol_g", 1.0),
];

const SEARCH_FIELDS: &str = "code,product_name,brands,serving_size,nutriments";

/// Map one OpenFoodFacts product onto a candidate
///
/// Products without a name, or with neither calories nor protein, are skipped.
pub fn candidate_from_product(product: &Value, category: Option<&str>) -> Option<FoodCandidate> {
    let text = |key: &str| {
        product
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let Some(name) = text("product_name") else {
        debug!(code = text("code").unwrap_or("-"), "skipping product without a name");
        return None;
    };

    let mut nutrients = Nutrients::default();
    if let Some(nutriments) = product.get("nutriments").and_then(Value::as_object) {
        for (key, column, factor) in NUTRIMENT_MAP {
            let Some(value) = nutriments.get(*key).and_then(|v| parse_number(key, v)) else {
                continue;
            };
            if let Some(slot) = nutrients.slot_mut(column) {
                *slot = Some(value * factor);
            }
        }
    }

    if nutrients.calories.is_none() && nutrients.protein_g.is_none() {
        debug!(product = name, "skipping product without basic nutrition");
        return None;
    }

    let mut candidate = FoodCandidate::new(name, DataSource::OpenFoodFacts)
        .with_basis(NutrientBasis::Per100g)
        .with_nutrients(nutrients);
    // "Brand A, Brand B": the first listed brand is the owner
    candidate.brand = text("brands")
        .and_then(|b| b.split(',').next())
        .map(|b| b.trim().to_string());
    candidate.external_id = text("code").map(str::to_string);
    candidate.serving_size = text("serving_size").map(str::to_string);
    candidate.category = category.map(str::to_string);
    Some(candidate)
}

enum Step {
    Category(String),
    Barcodes,
}

pub struct OpenFoodFactsImporter {
    client: Client,
    config: OpenFoodFactsConfig,
    steps: VecDeque<Step>,
    taken_from_categories: usize,
    requests: u64,
}

impl OpenFoodFactsImporter {
    pub fn new(config: &OpenFoodFactsConfig) -> Result<Self, ImportError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        let mut steps: VecDeque<Step> = config.categories.iter().cloned().map(Step::Category).collect();
        if !config.barcodes.is_empty() {
            steps.push_back(Step::Barcodes);
        }

        Ok(Self {
            client,
            config: config.clone(),
            steps,
            taken_from_categories: 0,
            requests: 0,
        })
    }

    fn pause(&mut self, delay: Duration) {
        if self.requests > 0 {
            thread::sleep(delay);
        }
        self.requests += 1;
    }

    fn search_category(&mut self, category: &str) -> Result<Vec<FoodCandidate>, ImportError> {
        self.pause(self.config.request_delay());
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));
        let body: Value = self
            .client
            .get(&url)
            .query(&[
                ("categories_tags", category.to_string()),
                ("fields", SEARCH_FIELDS.to_string()),
                ("page_size", self.config.page_size.to_string()),
                ("page", "1".to_string()),
                ("sort_by", "unique_scans_n".to_string()),
                ("json", "1".to_string()),
            ])
            .send()?
            .error_for_status()?
            .json()?;

        let products = body
            .get("products")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        debug!(category, products = products.len(), "category search returned");

        let remaining = self.config.limit.saturating_sub(self.taken_from_categories);
        let candidates: Vec<FoodCandidate> = products
            .iter()
            .filter_map(|p| candidate_from_product(p, Some(category)))
            .take(remaining)
            .collect();
        self.taken_from_categories += candidates.len();
        Ok(candidates)
    }

    fn fetch_barcode(&mut self, code: &str) -> Result<Option<FoodCandidate>, ImportError> {
        self.pause(self.config.barcode_delay());
        let url = format!("{}/product/{}.json", self.config.base_url.trim_end_matches('/'), code);
        let response = self.client.get(&url).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(code, "barcode not found");
            return Ok(None);
        }
        let body: Value = response.error_for_status()?.json()?;
        Ok(body.get("product").and_then(|p| candidate_from_product(p, None)))
    }
}

impl Importer for OpenFoodFactsImporter {
    fn name(&self) -> &str {
        "openfoodfacts"
    }

    fn next_batch(&mut self) -> Result<Option<ImportBatch>, ImportError> {
        while let Some(step) = self.steps.pop_front() {
            match step {
                Step::Category(category) => {
                    if self.taken_from_categories >= self.config.limit {
                        debug!(category = %category, "category limit reached, skipping");
                        continue;
                    }
                    match self.search_category(&category) {
                        Ok(candidates) => {
                            info!(category = %category, products = candidates.len(), "fetched category");
                            return Ok(Some(ImportBatch::new(category, candidates)));
                        }
                        Err(e) => warn!(category = %category, "skipping category: {}", e),
                    }
                }
                Step::Barcodes => {
                    let codes = self.config.barcodes.clone();
                    let mut candidates = Vec::new();
                    for code in &codes {
                        match self.fetch_barcode(code) {
                            Ok(Some(candidate)) => candidates.push(candidate),
                            Ok(None) => {}
                            Err(e) => warn!(code = %code, "skipping barcode: {}", e),
                        }
                    }
                    info!(requested = codes.len(), products = candidates.len(), "fetched barcodes");
                    return Ok(Some(ImportBatch::new("barcodes", candidates)));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_mapping_scales_units() {
        let product = json!({
            "code": "049000006346",
            "product_name": "Coca-Cola",
            "brands": "Coca-Cola, The Coca-Cola Company",
            "serving_size": "12 fl oz (355 ml)",
            "nutriments": {
                "energy-kcal_100g": 42,
                "carbohydrates_100g": 10.6,
                "sugars_100g": "10.6",
                "sodium_100g": 0.004,
                "caffeine_100g": 0.0096,
                "proteins_100g": 0
            }
        });

        let candidate = candidate_from_product(&product, Some("sodas")).unwrap();
        assert_eq!(candidate.name, "Coca-Cola");
        assert_eq!(candidate.brand.as_deref(), Some("Coca-Cola"));
        assert_eq!(candidate.source, DataSource::OpenFoodFacts);
        assert_eq!(candidate.nutrient_basis, Some(NutrientBasis::Per100g));
        assert_eq!(candidate.category.as_deref(), Some("sodas"));
        assert_eq!(candidate.external_id.as_deref(), Some("049000006346"));
        assert_eq!(candidate.nutrients.calories, Some(42.0));
        assert_eq!(candidate.nutrients.sugars_g, Some(10.6));
        assert_eq!(candidate.nutrients.protein_g, Some(0.0));
        assert!((candidate.nutrients.sodium_mg.unwrap() - 4.0).abs() < 1e-9);
        assert!((candidate.nutrients.caffeine_mg.unwrap() - 9.6).abs() < 1e-9);
        assert_eq!(candidate.nutrients.total_fat_g, None);

        let normalized = candidate.normalized();
        assert_eq!(normalized.serving_size_grams, Some(355.0));
    }

    #[test]
    fn test_product_without_basic_nutrition_skipped() {
        let product = json!({
            "product_name": "Mystery Snack",
            "nutriments": {"fat_100g": 12}
        });
        assert!(candidate_from_product(&product, None).is_none());
    }

    #[test]
    fn test_product_without_name_skipped() {
        let product = json!({
            "code": "1",
            "product_name": "  ",
            "nutriments": {"energy-kcal_100g": 100}
        });
        assert!(candidate_from_product(&product, None).is_none());
    }

    #[test]
    fn test_malformed_nutriment_dropped() {
        let product = json!({
            "product_name": "Granola Bar",
            "nutriments": {"energy-kcal_100g": "lots", "proteins_100g": 8}
        });
        let candidate = candidate_from_product(&product, None).unwrap();
        assert_eq!(candidate.nutrients.calories, None);
        assert_eq!(candidate.nutrients.protein_g, Some(8.0));
    }

    #[test]
    fn test_importer_plans_categories_then_barcodes() {
        let config = OpenFoodFactsConfig {
            categories: vec!["sodas".to_string(), "snacks".to_string()],
            barcodes: vec!["1".to_string()],
            ..Default::default()
        };
        let importer = OpenFoodFactsImporter::new(&config).unwrap();
        let plan: Vec<String> = importer
            .steps
            .iter()
            .map(|s| match s {
                Step::Category(c) => c.clone(),
                Step::Barcodes => "barcodes".to_string(),
            })
            .collect();
        assert_eq!(plan, vec!["sodas", "snacks", "barcodes"]);
    }
}
