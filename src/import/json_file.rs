//! JSON seed files
//!
//! Two shapes are accepted:
//! - `{ "Restaurant": [ {item}, ... ], ... }`, one batch per restaurant
//! - `[ {item}, ... ]`, one batch for the whole file
//!
//! Item keys go through `canonical_field`, so "item_name", "portion",
//! "carbohydrates_g" and friends work as-is.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{error, info, warn};

use super::{ImportBatch, ImportError, Importer};
use crate::models::{DataSource, FoodCandidate};

pub struct JsonImporter {
    name: String,
    source: DataSource,
    pending: VecDeque<(String, Option<String>, Vec<Value>)>,
}

impl JsonImporter {
    /// Read and parse a JSON file
    pub fn open<P: AsRef<Path>>(path: P, source: DataSource) -> Result<Self, ImportError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text)?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_value(label, value, source)
    }

    /// Build from an already parsed document
    pub fn from_value(label: impl Into<String>, value: Value, source: DataSource) -> Result<Self, ImportError> {
        let label = label.into();
        let mut pending = VecDeque::new();

        match value {
            Value::Object(restaurants) => {
                for (restaurant, items) in restaurants {
                    match items {
                        Value::Array(items) => pending.push_back((restaurant.clone(), Some(restaurant), items)),
                        other => warn!(
                            restaurant = %restaurant,
                            "expected a list of items, found {}",
                            kind(&other)
                        ),
                    }
                }
            }
            Value::Array(items) => pending.push_back((label.clone(), None, items)),
            other => {
                return Err(ImportError::Invalid(format!(
                    "{}: expected an object or array at the top level, found {}",
                    label,
                    kind(&other)
                )))
            }
        }

        info!(file = %label, batches = pending.len(), "loaded JSON seed file");
        Ok(Self {
            name: format!("json:{}", label),
            source,
            pending,
        })
    }

    fn candidate(&self, item: &Value, restaurant: Option<&str>) -> Option<FoodCandidate> {
        let Value::Object(fields) = item else {
            warn!("skipping non-object item: {}", kind(item));
            return None;
        };

        match FoodCandidate::from_fields(self.source, fields) {
            Ok(mut candidate) => {
                if candidate.restaurant.is_none() {
                    candidate.restaurant = restaurant.map(str::to_string);
                }
                Some(candidate)
            }
            Err(e) => {
                error!(restaurant = restaurant.unwrap_or("-"), "rejecting item: {}", e);
                None
            }
        }
    }
}

impl Importer for JsonImporter {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_batch(&mut self) -> Result<Option<ImportBatch>, ImportError> {
        let Some((label, restaurant, items)) = self.pending.pop_front() else {
            return Ok(None);
        };
        let candidates = items
            .iter()
            .filter_map(|item| self.candidate(item, restaurant.as_deref()))
            .collect();
        Ok(Some(ImportBatch::new(label, candidates)))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
