//! Glycemic index estimation and glycemic load
//!
//! The reference table is an explicit value; nothing here holds global state.

pub mod estimator;
pub mod load;
pub mod table;

pub use estimator::{estimate_gi, estimate_match, GiMatch, MatchStage};
pub use load::{calculate_gl, GiLevel, GlLevel};
pub use table::{FallbackRule, FoodGroup, GlycemicIndexEntry, GlycemicTable, TableError};
