//! Storage layer for autorule.
//!
//! SQLite-based persistence for records and user preferences. Rules
//! themselves live in YAML files (see `features::automation::storage`).

mod database;
mod migrations;

pub use database::Database;
