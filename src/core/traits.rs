//! Shared record capability and field values.
//!
//! The engine never reaches into concrete record types. It reads named fields
//! through [`Record::get`] and writes through the batched [`Record::write`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AutoruleError;
use crate::records::TargetModel;

/// A relational reference to another record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Id of the referenced record.
    pub id: i64,
    /// Display name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Reference {
    /// Reference by id only.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self { id, name: None }
    }

    /// Reference with a display name.
    #[must_use]
    pub fn named(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }
}

/// A value held by a record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    /// Unset.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Floating-point value.
    Decimal(f64),
    /// Text value.
    Text(String),
    /// List of values (e.g., many-to-many tag references).
    List(Vec<FieldValue>),
    /// Reference to another record.
    Reference(Reference),
}

/// Field name to value mapping used for batched writes.
pub type FieldMap = BTreeMap<String, FieldValue>;

impl FieldValue {
    /// Short kind name used in diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Reference(_) => "reference",
        }
    }

    /// Check if this value is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Truthiness: null, false, zero, empty text and empty lists are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Decimal(d) => *d != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Reference(_) => true,
        }
    }

    /// Textual form of the value.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::Text(s) => s.clone(),
            Self::List(items) => items
                .iter()
                .map(Self::to_text)
                .collect::<Vec<_>>()
                .join(", "),
            Self::Reference(r) => r.name.clone().unwrap_or_else(|| r.id.to_string()),
        }
    }

    /// Case-insensitive substring test on the textual forms.
    #[must_use]
    pub fn contains_text(&self, needle: &str) -> bool {
        self.to_text()
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }

    /// Equality across kinds.
    ///
    /// Integers and decimals compare numerically. A reference equals an
    /// integer with its id, or text that is either its id or (ignoring case)
    /// its display name.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Reference(a), Self::Reference(b)) => a.id == b.id,
            (Self::Reference(r), Self::Integer(id)) | (Self::Integer(id), Self::Reference(r)) => {
                r.id == *id
            },
            (Self::Reference(r), Self::Text(text)) | (Self::Text(text), Self::Reference(r)) => {
                reference_matches_text(r, text)
            },
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            },
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Ordering across comparable kinds, `None` when the kinds do not order.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Reference(r), Self::Integer(id)) => Some(r.id.cmp(id)),
            (Self::Integer(id), Self::Reference(r)) => Some(id.cmp(&r.id)),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// Numeric view of integers and decimals.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Id of a referenced record, accepting plain integer ids too.
    #[must_use]
    pub const fn as_reference_id(&self) -> Option<i64> {
        match self {
            Self::Reference(r) => Some(r.id),
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

fn reference_matches_text(reference: &Reference, text: &str) -> bool {
    let text = text.trim();
    if let Ok(id) = text.parse::<i64>() {
        return reference.id == id;
    }
    reference
        .name
        .as_deref()
        .is_some_and(|name| name.eq_ignore_ascii_case(text))
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(d: f64) -> Self {
        Self::Decimal(d)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Reference> for FieldValue {
    fn from(r: Reference) -> Self {
        Self::Reference(r)
    }
}

/// The record capability consumed by the rule engine.
///
/// Implementations are explicit per-model adapters; the engine needs nothing
/// beyond named reads, one batched write and identity metadata.
pub trait Record {
    /// Kind of record.
    fn model(&self) -> TargetModel;

    /// Persistent id, `None` for transient records.
    fn id(&self) -> Option<i64>;

    /// Get the value of a named field.
    ///
    /// Returns `None` if the field doesn't exist on this model.
    fn get(&self, field: &str) -> Option<FieldValue>;

    /// Whether the model has a field with this name.
    fn has_field(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Apply all changes together.
    ///
    /// # Errors
    ///
    /// Returns an error if any field is unknown or a value does not fit the
    /// field; in that case no change is applied.
    fn write(&mut self, values: FieldMap) -> Result<(), AutoruleError>;

    /// Owning user, read from the `user_id` field.
    fn owner(&self) -> Option<i64> {
        self.get("user_id").and_then(|v| v.as_reference_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_eq_numeric_cross_kind() {
        assert!(FieldValue::Integer(5).loose_eq(&FieldValue::Decimal(5.0)));
        assert!(!FieldValue::Integer(5).loose_eq(&FieldValue::Text("5".to_string())));
    }

    #[test]
    fn test_reference_equality() {
        let priority = FieldValue::Reference(Reference::named(3, "Urgent"));
        assert!(priority.loose_eq(&FieldValue::Integer(3)));
        assert!(priority.loose_eq(&FieldValue::Text("urgent".to_string())));
        assert!(priority.loose_eq(&FieldValue::Text("3".to_string())));
        assert!(!priority.loose_eq(&FieldValue::Text("Low".to_string())));
    }

    #[test]
    fn test_compare_mismatched_kinds() {
        assert_eq!(
            FieldValue::Integer(10).compare(&FieldValue::Integer(5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            FieldValue::Integer(10).compare(&FieldValue::Text("abc".to_string())),
            None
        );
    }

    #[test]
    fn test_contains_text_ignores_case() {
        let value = FieldValue::Text("Express".to_string());
        assert!(value.contains_text("express"));
        assert!(FieldValue::Integer(1234).contains_text("23"));
    }

    #[test]
    fn test_untagged_serde() {
        let json = r#"{"a": null, "b": 3, "c": 2.5, "d": "x", "e": {"id": 7, "name": "Bob"}}"#;
        let map: FieldMap = serde_json::from_str(json).unwrap();
        assert_eq!(map["a"], FieldValue::Null);
        assert_eq!(map["b"], FieldValue::Integer(3));
        assert_eq!(map["c"], FieldValue::Decimal(2.5));
        assert_eq!(map["d"], FieldValue::Text("x".to_string()));
        assert_eq!(map["e"], FieldValue::Reference(Reference::named(7, "Bob")));
    }

    #[test]
    fn test_truthiness() {
        assert!(!FieldValue::Null.is_truthy());
        assert!(!FieldValue::List(vec![]).is_truthy());
        assert!(FieldValue::Text("x".to_string()).is_truthy());
    }
}
