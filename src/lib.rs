//! nutriseed library
//!
//! Builds the bundled nutrition database: seeders, importers, upsert
//! reconciliation and glycemic index annotation.

pub mod build_info;
pub mod config;
pub mod db;
pub mod glycemic;
pub mod import;
pub mod models;
pub mod serving;
pub mod tools;
