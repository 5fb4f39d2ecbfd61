//! Import candidates
//!
//! A `FoodCandidate` carries only what a source actually reported. Importers
//! build them either directly or from a loose key/value bag (JSON objects,
//! CSV rows) through `FoodCandidate::from_fields`.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::food_record::{DataSource, NutrientBasis};
use super::Nutrients;
use crate::serving;

/// Errors that make a candidate unusable as a whole
#[derive(Debug, Error, PartialEq)]
pub enum CandidateError {
    #[error("candidate has no name")]
    MissingName,
}

/// Identity tuple of a stored record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub name: String,
    pub brand: Option<String>,
    pub restaurant: Option<String>,
    pub source: DataSource,
}

/// A partially populated food record headed for the store
#[derive(Debug, Clone, PartialEq)]
pub struct FoodCandidate {
    pub name: String,
    pub brand: Option<String>,
    pub restaurant: Option<String>,
    pub source: DataSource,
    pub external_id: Option<String>,
    pub category: Option<String>,
    pub serving_size: Option<String>,
    pub serving_size_grams: Option<f64>,
    pub nutrient_basis: Option<NutrientBasis>,
    pub nutrients: Nutrients,
    pub glycemic_index: Option<u8>,
    pub glycemic_load: Option<f64>,
}

impl FoodCandidate {
    pub fn new(name: impl Into<String>, source: DataSource) -> Self {
        Self {
            name: name.into(),
            brand: None,
            restaurant: None,
            source,
            external_id: None,
            category: None,
            serving_size: None,
            serving_size_grams: None,
            nutrient_basis: None,
            nutrients: Nutrients::default(),
            glycemic_index: None,
            glycemic_load: None,
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_restaurant(mut self, restaurant: impl Into<String>) -> Self {
        self.restaurant = Some(restaurant.into());
        self
    }

    pub fn with_serving(mut self, serving_size: impl Into<String>) -> Self {
        self.serving_size = Some(serving_size.into());
        self
    }

    pub fn with_basis(mut self, basis: NutrientBasis) -> Self {
        self.nutrient_basis = Some(basis);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_nutrients(mut self, nutrients: Nutrients) -> Self {
        self.nutrients = nutrients;
        self
    }

    /// Trim text fields, turn blanks into `None` and fill `serving_size_grams`
    /// from the serving text when the source gave no gram weight.
    ///
    /// Values the store cannot hold are dropped with a warning: a glycemic
    /// index above 100 and any NaN or infinite number.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.brand = non_blank(self.brand);
        self.restaurant = non_blank(self.restaurant);
        self.external_id = non_blank(self.external_id);
        self.category = non_blank(self.category);
        self.serving_size = non_blank(self.serving_size);

        for field in self.nutrients.drop_non_finite() {
            warn!(name = %self.name, field, "dropping non-finite value");
        }
        self.serving_size_grams = finite(&self.name, "serving_size_grams", self.serving_size_grams);
        self.glycemic_load = finite(&self.name, "glycemic_load", self.glycemic_load);
        if let Some(index) = self.glycemic_index.filter(|index| *index > 100) {
            warn!(name = %self.name, index, "dropping glycemic_index outside 0-100");
            self.glycemic_index = None;
        }

        if self.serving_size_grams.is_none() {
            self.serving_size_grams = self.serving_size.as_deref().and_then(serving::serving_grams);
        }
        self
    }

    /// Identity tuple; `None` when the name is blank
    pub fn identity(&self) -> Option<Identity> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Identity {
            name: name.to_string(),
            brand: non_blank(self.brand.clone()),
            restaurant: non_blank(self.restaurant.clone()),
            source: self.source,
        })
    }

    /// Build a candidate from a loose field bag
    ///
    /// Keys are matched after alias resolution (see `canonical_field`).
    /// Malformed numbers are logged and dropped, keeping any value another
    /// alias already supplied; unknown keys are ignored.
    pub fn from_fields(source: DataSource, fields: &Map<String, Value>) -> Result<Self, CandidateError> {
        let mut candidate = FoodCandidate::new(String::new(), source);

        for (key, value) in fields {
            let field = canonical_field(key);
            match field {
                "name" => candidate.name = text(value).unwrap_or_default(),
                "brand" => candidate.brand = text(value),
                "restaurant" => candidate.restaurant = text(value),
                "external_id" => candidate.external_id = text(value),
                "category" => candidate.category = text(value),
                "serving_size" => candidate.serving_size = text(value),
                "serving_size_grams" => {
                    if let Some(grams) = parse_number(field, value) {
                        candidate.serving_size_grams = Some(grams);
                    }
                }
                "nutrient_basis" => {
                    candidate.nutrient_basis = text(value).and_then(|s| match s.parse() {
                        Ok(basis) => Some(basis),
                        Err(e) => {
                            warn!(field, value = %s, "dropping malformed field: {}", e);
                            None
                        }
                    })
                }
                "glycemic_index" => {
                    if let Some(index) = parse_index(value) {
                        candidate.glycemic_index = Some(index);
                    }
                }
                "glycemic_load" => {
                    if let Some(load) = parse_number(field, value) {
                        candidate.glycemic_load = Some(load);
                    }
                }
                "source" => {
                    // The importer decides the source; a per-row tag is informational
                    debug!(value = %value, "ignoring per-row source tag");
                }
                other => match candidate.nutrients.slot_mut(other) {
                    // An alias that fails to parse must not clobber a value already read
                    Some(slot) => {
                        if let Some(number) = parse_number(other, value) {
                            *slot = Some(number);
                        }
                    }
                    None => debug!(field = key.as_str(), "ignoring unknown field"),
                },
            }
        }

        if candidate.name.trim().is_empty() {
            return Err(CandidateError::MissingName);
        }
        Ok(candidate)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn finite(name: &str, field: &'static str, value: Option<f64>) -> Option<f64> {
    match value {
        Some(v) if !v.is_finite() => {
            warn!(name, field, "dropping non-finite value");
            None
        }
        other => other,
    }
}

fn text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Map alternate spellings used by the various sources onto stored names
pub fn canonical_field(key: &str) -> &str {
    match key.trim() {
        "item_name" | "food_name" | "product_name" | "description" => "name",
        "brand_name" | "brands" | "brand_owner" => "brand",
        "restaurant_name" => "restaurant",
        "barcode" | "code" | "fdc_id" | "fdcId" => "external_id",
        "portion" => "serving_size",
        "data_source" => "source",
        "kcal" | "energy_kcal" => "calories",
        "carbohydrates_g" | "carbs_g" | "carbs" | "total_carbs" => "total_carbohydrate_g",
        "sugar_g" | "sugars" | "sugar" => "sugars_g",
        "fat_g" | "fat" | "total_fat" => "total_fat_g",
        "protein" => "protein_g",
        "fiber_g" | "fiber" => "dietary_fiber_g",
        "sodium" => "sodium_mg",
        "cholesterol" => "cholesterol_mg",
        other => other,
    }
}

/// Parse a numeric field, logging and discarding values that are not numbers
///
/// Blank strings and nulls are simply absent. Non-finite values are malformed.
pub fn parse_number(field: &str, value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Null => return None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => return None,
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Some(v),
        _ => {
            warn!(field, value = %value, "dropping malformed numeric field");
            None
        }
    }
}

fn parse_index(value: &Value) -> Option<u8> {
    let number = parse_number("glycemic_index", value)?;
    if (0.0..=100.0).contains(&number) && number.fract() == 0.0 {
        Some(number as u8)
    } else {
        warn!(value = %value, "dropping glycemic_index outside 0-100");
        None
    }
}

/// Lowercase token union of name, brand and restaurant, sorted and de-duplicated
pub fn search_terms(name: &str, brand: Option<&str>, restaurant: Option<&str>) -> String {
    let tokens: BTreeSet<String> = [Some(name), brand, restaurant]
        .into_iter()
        .flatten()
        .flat_map(str::split_whitespace)
        .map(|token| {
            token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|token| !token.is_empty())
        .collect();

    tokens.into_iter().collect::<Vec<_>>().join(" ")
}
