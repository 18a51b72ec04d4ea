//! autorule - conditional field automation for business records
//!
//! This crate provides a rule engine that evaluates conditions against
//! records on create and edit and mutates their fields accordingly, along
//! with a per-user default-value auto-fill layer for courier requests.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod features;
pub mod output;
pub mod records;
pub mod storage;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use error::AutoruleError;
pub use features::automation::{AutomationEngine, Rule};
pub use records::{ModelRecord, TargetModel};
