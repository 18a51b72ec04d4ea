//! Actions for automation rules.
//!
//! Actions describe the field changes a rule makes once its condition holds.
//! Every action ends in one batched write (or none), and every execution is
//! counted in the rule's statistics whatever its outcome.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::expr::evaluate_assignments;
use crate::core::{coerce, FieldMap, FieldValue, Record};
use crate::error::AutoruleError;

use super::events::{EngineEvent, EventSink};
use super::rule::Rule;
use super::safety;

/// What a rule does to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionSpec {
    /// Set one field from a text literal.
    SetField {
        /// Field name.
        #[serde(default)]
        field: String,
        /// Literal, coerced to the field's current kind.
        #[serde(default)]
        value: String,
    },
    /// Set several fields from a JSON object text.
    SetFields {
        /// JSON object text, e.g. `{"priority_id": "3", "weight": 2.5}`.
        values: String,
    },
    /// `field := expression` assignments.
    Custom {
        /// Assignment source.
        code: String,
    },
}

impl ActionSpec {
    /// Set one field.
    #[must_use]
    pub fn set_field(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::SetField {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Set several fields from JSON object text.
    #[must_use]
    pub fn set_fields(values: impl Into<String>) -> Self {
        Self::SetFields {
            values: values.into(),
        }
    }

    /// Custom assignment action.
    #[must_use]
    pub fn custom(code: impl Into<String>) -> Self {
        Self::Custom { code: code.into() }
    }

    /// Short type name, as stored.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::SetField { .. } => "set_field",
            Self::SetFields { .. } => "set_fields",
            Self::Custom { .. } => "custom",
        }
    }

    /// Work out the write this action would make, without making it.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON, uncompilable custom code, a
    /// failing expression or an unknown target field.
    pub fn plan<R: Record + ?Sized>(&self, record: &R) -> Result<Planned, AutoruleError> {
        match self {
            Self::SetField { field, value } => {
                if field.is_empty() || value.is_empty() {
                    return Ok(Planned::Skip("no field or value to set".to_string()));
                }
                let current = record.get(field).ok_or_else(|| AutoruleError::UnknownField {
                    model: record.model().display_name().to_string(),
                    field: field.clone(),
                })?;
                let mut values = FieldMap::new();
                values.insert(field.clone(), coerce(&current, value));
                Ok(Planned::Write(values))
            },
            Self::SetFields { values } => {
                let object: serde_json::Map<String, serde_json::Value> =
                    serde_json::from_str(values)?;
                let mut collected = FieldMap::new();
                for (key, raw) in object {
                    let Some(current) = record.get(&key) else {
                        continue;
                    };
                    let value = match raw {
                        serde_json::Value::Null => FieldValue::Null,
                        serde_json::Value::String(text) => coerce(&current, &text),
                        other => coerce(&current, &other.to_string()),
                    };
                    collected.insert(key, value);
                }
                if collected.is_empty() {
                    return Ok(Planned::Skip("no known fields in values".to_string()));
                }
                Ok(Planned::Write(collected))
            },
            Self::Custom { code } => {
                let assignments = safety::compile_action(code)?;
                evaluate_assignments(&assignments, record).map(Planned::Write)
            },
        }
    }
}

impl fmt::Display for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetField { field, value } => write!(f, "set {field} = {value}"),
            Self::SetFields { values } => write!(f, "set fields {values}"),
            Self::Custom { code } => write!(f, "custom: {code}"),
        }
    }
}

/// A write worked out by [`ActionSpec::plan`].
#[derive(Debug, Clone, PartialEq)]
pub enum Planned {
    /// Write these values in one batch.
    Write(FieldMap),
    /// Nothing to write.
    Skip(String),
}

/// How an action execution ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The record was written.
    Applied(FieldMap),
    /// There was nothing to write.
    Skipped(String),
    /// The action failed and the record was left untouched.
    Rejected(String),
}

impl ActionOutcome {
    /// Whether the record was written.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied(values) => {
                let parts: Vec<String> = values
                    .iter()
                    .map(|(name, value)| format!("{name} = {value}"))
                    .collect();
                write!(f, "set {}", parts.join(", "))
            },
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
            Self::Rejected(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Execute a rule's action against a record.
///
/// Never fails: problems become [`ActionOutcome::Rejected`] and are sent to
/// `sink`. The rule's execution statistics are updated in every case.
pub fn execute<R: Record + ?Sized>(
    rule: &mut Rule,
    record: &mut R,
    sink: &dyn EventSink,
    now: DateTime<Utc>,
) -> ActionOutcome {
    let outcome = match rule.action.plan(&*record) {
        Ok(Planned::Write(values)) => {
            let written = values.clone();
            match record.write(values) {
                Ok(()) => ActionOutcome::Applied(written),
                Err(e) => ActionOutcome::Rejected(e.to_string()),
            }
        },
        Ok(Planned::Skip(reason)) => ActionOutcome::Skipped(reason),
        Err(e) => ActionOutcome::Rejected(e.to_string()),
    };

    let event = match &outcome {
        ActionOutcome::Applied(values) => EngineEvent::ActionApplied {
            rule: rule.name.clone(),
            fields: values.keys().cloned().collect(),
        },
        ActionOutcome::Skipped(reason) => EngineEvent::ActionSkipped {
            rule: rule.name.clone(),
            reason: reason.clone(),
        },
        ActionOutcome::Rejected(error) => EngineEvent::ActionFailed {
            rule: rule.name.clone(),
            error: error.clone(),
        },
    };
    sink.emit(&event);

    rule.record_execution(now);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Reference;
    use crate::features::automation::events::MockEventSink;
    use crate::records::{ModelRecord, TargetModel};

    fn courier() -> ModelRecord {
        let mut values = FieldMap::new();
        values.insert("name".to_string(), FieldValue::from("CR/0007"));
        values.insert("state".to_string(), FieldValue::from("draft"));
        values.insert("weight".to_string(), FieldValue::Decimal(4.0));
        values.insert("package_count".to_string(), FieldValue::Integer(2));
        ModelRecord::with_values(TargetModel::CourierRequest, values).unwrap()
    }

    fn rule(action: ActionSpec) -> Rule {
        Rule::new("Test", TargetModel::CourierRequest, action)
    }

    fn quiet_sink() -> MockEventSink {
        let mut sink = MockEventSink::new();
        sink.expect_emit().return_const(());
        sink
    }

    #[test]
    fn test_set_field_coerces_to_current_kind() {
        let mut record = courier();
        let mut rule = rule(ActionSpec::set_field("package_count", "5"));

        let outcome = execute(&mut rule, &mut record, &quiet_sink(), Utc::now());

        assert!(outcome.is_applied());
        assert_eq!(record.get("package_count"), Some(FieldValue::Integer(5)));
    }

    #[test]
    fn test_set_field_reference_from_text_id() {
        let mut record = courier();
        let mut rule = rule(ActionSpec::set_field("priority_id", "3"));

        execute(&mut rule, &mut record, &quiet_sink(), Utc::now());

        assert_eq!(
            record.get("priority_id"),
            Some(FieldValue::Reference(Reference::new(3)))
        );
    }

    #[test]
    fn test_set_field_missing_value_is_skipped_but_counted() {
        let mut record = courier();
        let before = record.clone();
        let mut rule = rule(ActionSpec::set_field("state", ""));

        let outcome = execute(&mut rule, &mut record, &quiet_sink(), Utc::now());

        assert!(matches!(outcome, ActionOutcome::Skipped(_)));
        assert_eq!(record, before);
        assert_eq!(rule.execution_count, 1);
        assert!(rule.last_execution.is_some());
    }

    #[test]
    fn test_set_fields_skips_unknown_keys() {
        let mut record = courier();
        let mut rule = rule(ActionSpec::set_fields(
            r#"{"state": "confirmed", "weight": 7.5, "colour": "red", "notes": null}"#,
        ));

        let outcome = execute(&mut rule, &mut record, &quiet_sink(), Utc::now());

        let ActionOutcome::Applied(values) = outcome else {
            panic!("expected applied outcome");
        };
        assert_eq!(values.len(), 3);
        assert_eq!(record.get("state"), Some(FieldValue::from("confirmed")));
        assert_eq!(record.get("weight"), Some(FieldValue::Decimal(7.5)));
    }

    #[test]
    fn test_set_fields_all_unknown_still_counts() {
        let mut record = courier();
        let mut rule = rule(ActionSpec::set_fields(r#"{"colour": "red"}"#));

        let outcome = execute(&mut rule, &mut record, &quiet_sink(), Utc::now());

        assert!(matches!(outcome, ActionOutcome::Skipped(_)));
        assert_eq!(rule.execution_count, 1);
    }

    #[test]
    fn test_set_fields_malformed_json_is_rejected() {
        let mut record = courier();
        let before = record.clone();
        let mut rule = rule(ActionSpec::set_fields("{state: oops"));

        let mut sink = MockEventSink::new();
        sink.expect_emit()
            .withf(|event| matches!(event, EngineEvent::ActionFailed { .. }))
            .times(1)
            .return_const(());

        let outcome = execute(&mut rule, &mut record, &sink, Utc::now());

        assert!(matches!(outcome, ActionOutcome::Rejected(_)));
        assert_eq!(record, before);
        assert_eq!(rule.execution_count, 1);
    }

    #[test]
    fn test_custom_reads_pre_action_state() {
        let mut record = courier();
        let mut rule = rule(ActionSpec::custom(
            "package_count := package_count * 2; weight := package_count + 0.5",
        ));

        execute(&mut rule, &mut record, &quiet_sink(), Utc::now());

        assert_eq!(record.get("package_count"), Some(FieldValue::Integer(4)));
        assert_eq!(record.get("weight"), Some(FieldValue::Decimal(2.5)));
    }

    #[test]
    fn test_custom_failure_writes_nothing() {
        let mut record = courier();
        let before = record.clone();
        let mut rule = rule(ActionSpec::custom("state := 'ok'; weight := weight / 0"));

        let outcome = execute(&mut rule, &mut record, &quiet_sink(), Utc::now());

        assert!(matches!(outcome, ActionOutcome::Rejected(_)));
        assert_eq!(record, before);
        assert_eq!(rule.execution_count, 1);
    }

    #[test]
    fn test_write_type_mismatch_is_rejected() {
        let mut record = courier();
        let mut rule = rule(ActionSpec::set_field("package_count", "many"));

        let outcome = execute(&mut rule, &mut record, &quiet_sink(), Utc::now());

        assert!(matches!(outcome, ActionOutcome::Rejected(_)));
        assert_eq!(record.get("package_count"), Some(FieldValue::Integer(2)));
    }

    #[test]
    fn test_statistics_accumulate() {
        let mut record = courier();
        let mut rule = rule(ActionSpec::set_field("state", "sent"));
        let first = Utc::now();
        let second = first + chrono::Duration::minutes(5);

        execute(&mut rule, &mut record, &quiet_sink(), first);
        assert_eq!(rule.last_execution, Some(first));

        execute(&mut rule, &mut record, &quiet_sink(), second);

        assert_eq!(rule.execution_count, 2);
        assert_eq!(rule.last_execution, Some(second));
    }
}
