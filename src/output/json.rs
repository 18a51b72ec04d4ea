//! JSON output formatting for autorule.
//!
//! This module provides functions for formatting rules and records as JSON.

use serde::Serialize;
use serde_json::json;

use crate::error::AutoruleError;
use crate::features::automation::Rule;
use crate::records::ModelRecord;

/// Format rules as JSON
///
/// # Errors
///
/// Returns `AutoruleError::Parse` if JSON serialization fails.
pub fn format_rules_json(rules: &[Rule]) -> Result<String, AutoruleError> {
    let output = json!({
        "count": rules.len(),
        "items": rules
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format records as JSON
///
/// # Errors
///
/// Returns `AutoruleError::Parse` if JSON serialization fails.
pub fn format_records_json(records: &[ModelRecord]) -> Result<String, AutoruleError> {
    let output = json!({
        "count": records.len(),
        "items": records
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Generic JSON formatter for any serializable type
///
/// # Errors
///
/// Returns `AutoruleError::Parse` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, AutoruleError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldMap, FieldValue};
    use crate::features::automation::{ActionSpec, ConditionOperator, ConditionSpec};
    use crate::records::TargetModel;

    #[test]
    fn test_format_rules_json_empty_list() {
        let result = format_rules_json(&[]).unwrap();

        assert!(result.contains("\"count\": 0"));
        assert!(result.contains("\"items\": []"));
    }

    #[test]
    fn test_format_rules_json_shape() {
        let rule = Rule::new(
            "Heavy",
            TargetModel::CourierRequest,
            ActionSpec::set_field("notes", "heavy"),
        )
        .with_condition(ConditionSpec::field(
            "weight",
            ConditionOperator::GreaterOrEqual,
            "20",
        ));
        let result = format_rules_json(&[rule]).unwrap();

        assert!(result.contains("\"count\": 1"));
        assert!(result.contains("\"name\": \"Heavy\""));
        assert!(result.contains("\"target_model\": \"courier_request\""));
        assert!(result.contains("\"operator\": \">=\""));
        assert!(result.contains("\"type\": \"set_field\""));
    }

    #[test]
    fn test_format_records_json() {
        let mut values = FieldMap::new();
        values.insert("city".to_string(), FieldValue::from("Lyon"));
        let record = ModelRecord::with_values(TargetModel::Partner, values).unwrap();

        let result = format_records_json(&[record]).unwrap();

        assert!(result.contains("\"count\": 1"));
        assert!(result.contains("\"model\": \"partner\""));
        assert!(result.contains("\"city\": \"Lyon\""));
    }

    #[test]
    fn test_to_json_generic() {
        let data = json!({"deleted": "Heavy"});
        let result = to_json(&data).unwrap();
        assert!(result.contains("\"deleted\": \"Heavy\""));
    }
}
