//! Data models
//!
//! Rust structs representing stored foods and import candidates.

mod candidate;
mod food_record;
mod nutrients;
mod synonym;

pub use candidate::{canonical_field, parse_number, search_terms, CandidateError, FoodCandidate, Identity};
pub use food_record::{DataSource, FoodRecord, NutrientBasis, UpsertOutcome};
pub use nutrients::Nutrients;
pub use synonym::{primary_names, write_synonyms, SYNONYMS};
