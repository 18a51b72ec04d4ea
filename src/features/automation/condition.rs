//! Conditions for automation rules.
//!
//! Conditions decide whether a rule's action runs for a record. Evaluation
//! never fails from the caller's point of view: any problem is reported to
//! the event sink and the condition counts as not met.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{coerce, coerce_collection, FieldValue, Record};
use crate::error::AutoruleError;

use super::events::{EngineEvent, EventSink};
use super::rule::Rule;
use super::safety;

/// When a rule applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionSpec {
    /// Always applies.
    #[default]
    Always,
    /// Compare one field against a literal.
    FieldValue {
        /// Field name.
        field: String,
        /// Comparison operator.
        #[serde(default)]
        operator: ConditionOperator,
        /// Literal, coerced to the field's kind at evaluation time.
        #[serde(default)]
        value: String,
    },
    /// Boolean expression over the record's fields.
    Custom {
        /// Expression source.
        code: String,
    },
}

impl ConditionSpec {
    /// Compare `field` against `value`.
    #[must_use]
    pub fn field(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<String>,
    ) -> Self {
        Self::FieldValue {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Custom expression condition.
    #[must_use]
    pub fn custom(code: impl Into<String>) -> Self {
        Self::Custom { code: code.into() }
    }

    /// Short type name, as stored.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::FieldValue { .. } => "field_value",
            Self::Custom { .. } => "custom",
        }
    }

    /// Evaluate against a record, reporting failures.
    ///
    /// An absent or null field is simply "not met".
    ///
    /// # Errors
    ///
    /// Returns an error for uncompilable custom code, incomparable values in
    /// an ordering comparison, or a failing expression.
    pub fn try_evaluate<R: Record + ?Sized>(&self, record: &R) -> Result<bool, AutoruleError> {
        match self {
            Self::Always => Ok(true),
            Self::FieldValue {
                field,
                operator,
                value,
            } => match record.get(field) {
                None | Some(FieldValue::Null) => Ok(false),
                Some(current) => operator.apply(&current, value),
            },
            Self::Custom { code } => safety::compile_condition(code)?.evaluate_bool(record),
        }
    }
}

impl fmt::Display for ConditionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("always"),
            Self::FieldValue {
                field,
                operator,
                value,
            } => write!(f, "{field} {operator} {value}"),
            Self::Custom { code } => write!(f, "custom: {code}"),
        }
    }
}

/// Evaluate a rule's condition against a record.
///
/// Never fails: errors are sent to `sink` and count as "not met".
pub fn evaluate<R: Record + ?Sized>(rule: &Rule, record: &R, sink: &dyn EventSink) -> bool {
    match rule.condition.try_evaluate(record) {
        Ok(met) => met,
        Err(e) => {
            sink.emit(&EngineEvent::ConditionFailed {
                rule: rule.name.clone(),
                error: e.to_string(),
            });
            false
        },
    }
}

/// Comparison operators for field conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConditionOperator {
    /// Equal to
    #[default]
    #[serde(rename = "=")]
    Equals,
    /// Not equal to
    #[serde(rename = "!=")]
    NotEquals,
    /// Greater than
    #[serde(rename = ">")]
    GreaterThan,
    /// Less than
    #[serde(rename = "<")]
    LessThan,
    /// Greater than or equal to
    #[serde(rename = ">=")]
    GreaterOrEqual,
    /// Less than or equal to
    #[serde(rename = "<=")]
    LessOrEqual,
    /// Member of a collection literal
    #[serde(rename = "in")]
    In,
    /// Not a member of a collection literal
    #[serde(rename = "not in")]
    NotIn,
    /// Case-insensitive substring
    #[serde(rename = "contains", alias = "like")]
    Contains,
    /// Negated case-insensitive substring
    #[serde(rename = "not contains", alias = "not like")]
    NotContains,
}

impl ConditionOperator {
    /// All operators, in display order.
    pub const ALL: [Self; 10] = [
        Self::Equals,
        Self::NotEquals,
        Self::GreaterThan,
        Self::LessThan,
        Self::GreaterOrEqual,
        Self::LessOrEqual,
        Self::In,
        Self::NotIn,
        Self::Contains,
        Self::NotContains,
    ];

    /// Operator as written in rule files.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Contains => "contains",
            Self::NotContains => "not contains",
        }
    }

    /// Apply the operator to a non-null field value and a rule literal.
    ///
    /// # Errors
    ///
    /// Returns an error when an ordering operator meets values that do not
    /// order.
    pub fn apply(&self, current: &FieldValue, literal: &str) -> Result<bool, AutoruleError> {
        match self {
            Self::Equals => Ok(current.loose_eq(&coerce(current, literal))),
            Self::NotEquals => Ok(!current.loose_eq(&coerce(current, literal))),
            Self::GreaterThan => ordering(current, literal).map(Ordering::is_gt),
            Self::LessThan => ordering(current, literal).map(Ordering::is_lt),
            Self::GreaterOrEqual => ordering(current, literal).map(Ordering::is_ge),
            Self::LessOrEqual => ordering(current, literal).map(Ordering::is_le),
            Self::In => Ok(is_member(current, literal)),
            Self::NotIn => Ok(!is_member(current, literal)),
            Self::Contains => Ok(current.contains_text(literal)),
            Self::NotContains => Ok(!current.contains_text(literal)),
        }
    }
}

fn ordering(current: &FieldValue, literal: &str) -> Result<Ordering, AutoruleError> {
    let other = match (current, coerce(current, literal)) {
        (FieldValue::Reference(_), FieldValue::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map_or(FieldValue::Text(text), FieldValue::Integer),
        (_, coerced) => coerced,
    };

    current.compare(&other).ok_or_else(|| {
        AutoruleError::Expression(format!(
            "Cannot order {} value '{current}' against '{literal}'",
            current.kind_name()
        ))
    })
}

fn is_member(current: &FieldValue, literal: &str) -> bool {
    let items = coerce_collection(current, literal);
    match current {
        FieldValue::List(values) => values
            .iter()
            .any(|value| items.iter().any(|item| value.loose_eq(item))),
        value => items.iter().any(|item| value.loose_eq(item)),
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for ConditionOperator {
    type Err = AutoruleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "=" | "==" | "eq" | "equals" => Ok(Self::Equals),
            "!=" | "<>" | "ne" | "not equals" => Ok(Self::NotEquals),
            ">" | "gt" | "greater than" => Ok(Self::GreaterThan),
            "<" | "lt" | "less than" => Ok(Self::LessThan),
            ">=" | "ge" | "greater or equal" => Ok(Self::GreaterOrEqual),
            "<=" | "le" | "less or equal" => Ok(Self::LessOrEqual),
            "in" => Ok(Self::In),
            "not in" | "notin" => Ok(Self::NotIn),
            "contains" | "like" => Ok(Self::Contains),
            "not contains" | "not like" => Ok(Self::NotContains),
            _ => Err(AutoruleError::Validation(format!(
                "Unknown operator '{s}'. Expected one of: {}",
                Self::ALL
                    .iter()
                    .map(Self::symbol)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}
