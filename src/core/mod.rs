//! Core abstractions for autorule.
//!
//! This module provides the record capability, field values, literal
//! coercion and the expression language shared by the rule engine.

mod coerce;
pub mod expr;
mod traits;

pub use coerce::{coerce, coerce_collection};
pub use traits::{FieldMap, FieldValue, Record, Reference};
