//! USDA FoodData Central importer
//!
//! Pages through `/foods/list` per data type and fetches `/food/{fdcId}` for
//! every listed food. One list page becomes one batch. Failed list pages end
//! that data type; failed detail fetches skip that food.

use std::collections::VecDeque;
use std::thread;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{ImportBatch, ImportError, Importer};
use crate::config::UsdaConfig;
use crate::models::{DataSource, FoodCandidate, NutrientBasis, Nutrients};

/// FDC nutrient id → stored column, with a multiplier into the column's unit
const NUTRIENT_MAP: &[(u32, &str, f64)] = &[
    (1003, "protein_g", 1.0),
    (1004, "total_fat_g", 1.0),
    (1005, "total_carbohydrate_g", 1.0),
    (1008, "calories", 1.0),
    (1009, "sugars_g", 1.0),
    (1079, "dietary_fiber_g", 1.0),
    (1087, "calcium_mg", 1.0),
    (1089, "iron_mg", 1.0),
    (1090, "magnesium_mg", 1.0),
    (1091, "phosphorus_mg", 1.0),
    (1092, "potassium_mg", 1.0),
    (1093, "sodium_mg", 1.0),
    (1095, "zinc_mg", 1.0),
    (1103, "selenium_mcg", 1.0),
    (1104, "vitamin_c_mg", 1.0),
    (1105, "thiamin_mg", 1.0),
    (1106, "riboflavin_mg", 1.0),
    (1107, "niacin_mg", 1.0),
    (1109, "vitamin_b6_mg", 1.0),
    (1114, "vitamin_d_mcg", 1.0),
    (1123, "vitamin_e_mg", 1.0),
    (1165, "vitamin_b12_mcg", 1.0),
    (1175, "vitamin_k_mcg", 1.0),
    (1177, "folate_mcg", 1.0),
    (1180, "vitamin_a_mcg_rae", 1.0),
    (1253, "cholesterol_mg", 1.0),
    (1257, "trans_fat_g", 1.0),
    (1258, "saturated_fat_g", 1.0),
    (1259, "monounsaturated_fat_g", 1.0),
    (1260, "polyunsaturated_fat_g", 1.0),
    // Reported in g
    (1264, "omega3_fatty_acids_mg", 1000.0),
    (1269, "sugars_g", 1.0),
    (1275, "added_sugars_g", 1.0),
    (1369, "caffeine_mg", 1.0),
];

fn nutrient_column(id: u32) -> Option<(&'static str, f64)> {
    NUTRIENT_MAP
        .iter()
        .find(|(nid, _, _)| *nid == id)
        .map(|(_, column, factor)| (*column, *factor))
}

/// Source tag for an FDC data type
pub fn source_for_data_type(data_type: &str) -> DataSource {
    if data_type.eq_ignore_ascii_case("branded") {
        DataSource::UsdaBranded
    } else {
        DataSource::UsdaFoundation
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedFood {
    fdc_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListPage {
    Plain(Vec<ListedFood>),
    Paged {
        #[serde(default)]
        foods: Vec<ListedFood>,
        #[serde(rename = "totalPages")]
        total_pages: Option<u32>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoodDetail {
    description: Option<String>,
    brand_name: Option<String>,
    brand_owner: Option<String>,
    food_category: Option<Value>,
    branded_food_category: Option<String>,
    serving_size: Option<f64>,
    serving_size_unit: Option<String>,
    household_serving_full_text: Option<String>,
    #[serde(default)]
    food_nutrients: Vec<FoodNutrient>,
}

#[derive(Debug, Deserialize)]
struct FoodNutrient {
    nutrient: Option<NutrientRef>,
    amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NutrientRef {
    id: u32,
}

/// Map a `/food/{fdcId}` response onto a candidate
///
/// Values are per 100 g. Returns `None` when the food has no description.
pub fn candidate_from_detail(fdc_id: u64, data_type: &str, detail: &Value) -> Option<FoodCandidate> {
    let detail = match FoodDetail::deserialize(detail) {
        Ok(d) => d,
        Err(e) => {
            warn!(fdc_id, "unreadable food detail: {}", e);
            return None;
        }
    };

    let name = detail.description.as_deref().map(str::trim).filter(|s| !s.is_empty())?;

    let mut nutrients = Nutrients::default();
    for entry in &detail.food_nutrients {
        let (Some(nutrient), Some(amount)) = (&entry.nutrient, entry.amount) else {
            continue;
        };
        if let Some((column, factor)) = nutrient_column(nutrient.id) {
            if let Some(slot) = nutrients.slot_mut(column) {
                *slot = Some(amount * factor);
            }
        }
    }

    let category = match &detail.food_category {
        Some(Value::Object(map)) => map.get("description").and_then(Value::as_str).map(str::to_string),
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
    .or(detail.branded_food_category.clone());

    let mut candidate = FoodCandidate::new(name, source_for_data_type(data_type))
        .with_basis(NutrientBasis::Per100g)
        .with_nutrients(nutrients);
    candidate.external_id = Some(fdc_id.to_string());
    candidate.brand = detail.brand_name.clone().or(detail.brand_owner.clone());
    candidate.category = category;

    if let (Some(size), Some(unit)) = (detail.serving_size, detail.serving_size_unit.as_deref()) {
        let unit = unit.trim().to_lowercase();
        let text = match &detail.household_serving_full_text {
            Some(household) if !household.trim().is_empty() => {
                format!("{} ({} {})", household.trim(), size, unit)
            }
            _ => format!("{} {}", size, unit),
        };
        candidate.serving_size = Some(text);
    }

    Some(candidate)
}

/// Pages of `/foods/list` still to fetch for one data type
struct DataTypeCursor {
    data_type: String,
    next_page: u32,
    /// Known once the API reports it
    total_pages: Option<u32>,
}

pub struct UsdaImporter {
    client: Client,
    config: UsdaConfig,
    pending: VecDeque<DataTypeCursor>,
    requests: u64,
}

impl UsdaImporter {
    pub fn new(config: &UsdaConfig) -> Result<Self, ImportError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("nutriseed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let pending = config
            .data_types
            .iter()
            .map(|data_type| DataTypeCursor {
                data_type: data_type.clone(),
                next_page: 1,
                total_pages: None,
            })
            .collect();

        Ok(Self {
            client,
            config: config.clone(),
            pending,
            requests: 0,
        })
    }

    fn get_json(&mut self, url: &str, query: &[(&str, String)]) -> Result<Value, ImportError> {
        if self.requests > 0 {
            thread::sleep(self.config.request_delay());
        }
        self.requests += 1;

        let response = self
            .client
            .get(url)
            .query(&[("api_key", self.config.api_key.as_str())])
            .query(query)
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }

    fn fetch_list_page(&mut self, data_type: &str, page: u32) -> Result<(Vec<u64>, Option<u32>), ImportError> {
        let url = format!("{}/foods/list", self.config.base_url.trim_end_matches('/'));
        let body = self.get_json(
            &url,
            &[
                ("pageSize", self.config.page_size.to_string()),
                ("pageNumber", page.to_string()),
                ("dataType", data_type.to_string()),
            ],
        )?;

        let (foods, total_pages) = match serde_json::from_value::<ListPage>(body)? {
            ListPage::Plain(foods) => (foods, None),
            ListPage::Paged { foods, total_pages } => (foods, total_pages),
        };
        Ok((foods.into_iter().map(|f| f.fdc_id).collect(), total_pages))
    }

    fn fetch_detail(&mut self, fdc_id: u64, data_type: &str) -> Option<FoodCandidate> {
        let url = format!("{}/food/{}", self.config.base_url.trim_end_matches('/'), fdc_id);
        match self.get_json(&url, &[]) {
            Ok(detail) => candidate_from_detail(fdc_id, data_type, &detail),
            Err(e) => {
                warn!(fdc_id, "skipping food, detail fetch failed: {}", e);
                None
            }
        }
    }
}

impl Importer for UsdaImporter {
    fn name(&self) -> &str {
        "usda"
    }

    fn next_batch(&mut self) -> Result<Option<ImportBatch>, ImportError> {
        while let Some(mut cursor) = self.pending.pop_front() {
            let last_page = cursor
                .total_pages
                .map_or(self.config.max_pages, |total| total.min(self.config.max_pages));
            if cursor.next_page > last_page {
                info!(data_type = %cursor.data_type, "data type finished");
                continue;
            }

            let page = cursor.next_page;
            let (ids, total_pages) = match self.fetch_list_page(&cursor.data_type, page) {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(data_type = %cursor.data_type, page, "list fetch failed, skipping data type: {}", e);
                    continue;
                }
            };
            if ids.is_empty() {
                debug!(data_type = %cursor.data_type, page, "empty page, data type finished");
                continue;
            }

            let data_type = cursor.data_type.clone();
            let candidates: Vec<FoodCandidate> = ids
                .into_iter()
                .filter_map(|id| self.fetch_detail(id, &data_type))
                .collect();
            info!(data_type = %data_type, page, foods = candidates.len(), "fetched USDA page");

            cursor.next_page += 1;
            cursor.total_pages = cursor.total_pages.or(total_pages);
            self.pending.push_front(cursor);
            return Ok(Some(ImportBatch::new(format!("{} page {}", data_type, page), candidates)));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_foundation_detail_mapping() {
        let detail = json!({
            "fdcId": 171705,
            "description": "Broccoli, raw",
            "dataType": "Foundation",
            "foodCategory": {"description": "Vegetables and Vegetable Products"},
            "foodNutrients": [
                {"nutrient": {"id": 1008, "name": "Energy"}, "amount": 34.0},
                {"nutrient": {"id": 1003, "name": "Protein"}, "amount": 2.82},
                {"nutrient": {"id": 1005}, "amount": 6.64},
                {"nutrient": {"id": 1264}, "amount": 0.021},
                {"nutrient": {"id": 1087}},
                {"nutrient": {"id": 9999}, "amount": 5.0}
            ]
        });

        let candidate = candidate_from_detail(171705, "Foundation", &detail).unwrap();
        assert_eq!(candidate.name, "Broccoli, raw");
        assert_eq!(candidate.source, DataSource::UsdaFoundation);
        assert_eq!(candidate.nutrient_basis, Some(NutrientBasis::Per100g));
        assert_eq!(candidate.external_id.as_deref(), Some("171705"));
        assert_eq!(candidate.category.as_deref(), Some("Vegetables and Vegetable Products"));
        assert_eq!(candidate.nutrients.calories, Some(34.0));
        assert_eq!(candidate.nutrients.protein_g, Some(2.82));
        assert_eq!(candidate.nutrients.total_carbohydrate_g, Some(6.64));
        assert_eq!(candidate.nutrients.omega3_fatty_acids_mg, Some(21.0));
        // Listed without an amount: stays unknown
        assert_eq!(candidate.nutrients.calcium_mg, None);
        assert_eq!(candidate.nutrients.known_count(), 4);
    }

    #[test]
    fn test_branded_detail_mapping() {
        let detail = json!({
            "description": "FROSTED FLAKES",
            "brandOwner": "Kellogg Company US",
            "brandedFoodCategory": "Cereal",
            "servingSize": 39.0,
            "servingSizeUnit": "g",
            "householdServingFullText": "1 cup",
            "foodNutrients": [
                {"nutrient": {"id": 1005}, "amount": 89.7}
            ]
        });

        let candidate = candidate_from_detail(2041155, "Branded", &detail).unwrap();
        assert_eq!(candidate.source, DataSource::UsdaBranded);
        assert_eq!(candidate.brand.as_deref(), Some("Kellogg Company US"));
        assert_eq!(candidate.category.as_deref(), Some("Cereal"));
        assert_eq!(candidate.serving_size.as_deref(), Some("1 cup (39 g)"));

        let normalized = candidate.normalized();
        assert_eq!(normalized.serving_size_grams, Some(39.0));
    }

    #[test]
    fn test_detail_without_description_skipped() {
        assert!(candidate_from_detail(1, "Foundation", &json!({"foodNutrients": []})).is_none());
        assert!(candidate_from_detail(1, "Foundation", &json!({"description": "  "})).is_none());
        assert!(candidate_from_detail(1, "Foundation", &json!("not an object")).is_none());
    }

    #[test]
    fn test_list_page_shapes() {
        let plain: ListPage = serde_json::from_value(json!([{"fdcId": 1}, {"fdcId": 2}])).unwrap();
        assert!(matches!(plain, ListPage::Plain(ref f) if f.len() == 2));

        let paged: ListPage =
            serde_json::from_value(json!({"foods": [{"fdcId": 3}], "totalPages": 7})).unwrap();
        match paged {
            ListPage::Paged { foods, total_pages } => {
                assert_eq!(foods.len(), 1);
                assert_eq!(total_pages, Some(7));
            }
            ListPage::Plain(_) => panic!("expected paged response"),
        }
    }

    #[test]
    fn test_source_for_data_type() {
        assert_eq!(source_for_data_type("Branded"), DataSource::UsdaBranded);
        assert_eq!(source_for_data_type("SR Legacy"), DataSource::UsdaFoundation);
        assert_eq!(source_for_data_type("Foundation"), DataSource::UsdaFoundation);
    }
}
