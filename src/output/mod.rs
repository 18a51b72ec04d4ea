//! Output formatting for autorule.
//!
//! This module provides formatters for displaying rules, records and
//! preferences in various formats.

mod json;
mod pretty;

use crate::cli::args::OutputFormat;
use crate::error::AutoruleError;
use crate::features::automation::Rule;
use crate::records::ModelRecord;

pub use json::*;
pub use pretty::*;

/// Format rules based on output format
///
/// # Errors
///
/// Returns `AutoruleError::Parse` if JSON serialization fails.
pub fn format_rules(rules: &[Rule], format: OutputFormat) -> Result<String, AutoruleError> {
    match format {
        OutputFormat::Pretty => Ok(format_rules_pretty(rules)),
        OutputFormat::Json => format_rules_json(rules),
    }
}

/// Format a single rule based on output format
///
/// # Errors
///
/// Returns `AutoruleError::Parse` if JSON serialization fails.
pub fn format_rule(rule: &Rule, format: OutputFormat) -> Result<String, AutoruleError> {
    match format {
        OutputFormat::Pretty => Ok(format_rule_pretty(rule)),
        OutputFormat::Json => to_json(rule),
    }
}

/// Format records based on output format
///
/// # Errors
///
/// Returns `AutoruleError::Parse` if JSON serialization fails.
pub fn format_records(records: &[ModelRecord], format: OutputFormat) -> Result<String, AutoruleError> {
    match format {
        OutputFormat::Pretty => Ok(format_records_pretty(records)),
        OutputFormat::Json => format_records_json(records),
    }
}

/// Format a single record based on output format
///
/// # Errors
///
/// Returns `AutoruleError::Parse` if JSON serialization fails.
pub fn format_record(record: &ModelRecord, format: OutputFormat) -> Result<String, AutoruleError> {
    match format {
        OutputFormat::Pretty => Ok(format_record_pretty(record)),
        OutputFormat::Json => to_json(record),
    }
}
