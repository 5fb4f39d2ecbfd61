//! Database module
//!
//! Handles the SQLite file handle and migrations.

pub mod connection;
pub mod migrations;

pub use connection::{Database, DbError, DbResult};
