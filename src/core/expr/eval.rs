//! Evaluation of expressions against a record.

use std::cmp::Ordering;

use crate::core::{FieldMap, FieldValue, Record};
use crate::error::AutoruleError;

use super::ast::{Assignment, BinaryOp, Expr, Function, UnaryOp};

impl Expr {
    /// Evaluate against the fields of `record`.
    ///
    /// # Errors
    ///
    /// Returns an error when the expression reads a field the record does not
    /// have, orders values that do not compare, divides by zero or overflows.
    pub fn evaluate<R: Record + ?Sized>(&self, record: &R) -> Result<FieldValue, AutoruleError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Field(name) => record.get(name).ok_or_else(|| AutoruleError::UnknownField {
                model: record.model().display_name().to_string(),
                field: name.clone(),
            }),
            Self::List(items) => items
                .iter()
                .map(|item| item.evaluate(record))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::List),
            Self::Unary { op, operand } => {
                let value = operand.evaluate(record)?;
                match op {
                    UnaryOp::Not => Ok(FieldValue::Bool(!value.is_truthy())),
                    UnaryOp::Neg => negate(&value),
                }
            },
            Self::IsNull { operand, negated } => {
                let is_null = operand.evaluate(record)?.is_null();
                Ok(FieldValue::Bool(is_null != *negated))
            },
            Self::Binary { left, op, right } => match op {
                BinaryOp::And => {
                    let result = left.evaluate(record)?.is_truthy()
                        && right.evaluate(record)?.is_truthy();
                    Ok(FieldValue::Bool(result))
                },
                BinaryOp::Or => {
                    let result = left.evaluate(record)?.is_truthy()
                        || right.evaluate(record)?.is_truthy();
                    Ok(FieldValue::Bool(result))
                },
                _ => {
                    let left = left.evaluate(record)?;
                    let right = right.evaluate(record)?;
                    apply_binary(*op, &left, &right)
                },
            },
            Self::Call { function, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(record))
                    .collect::<Result<Vec<_>, _>>()?;
                call(*function, &values)
            },
        }
    }

    /// Evaluate and reduce to truthiness.
    ///
    /// # Errors
    ///
    /// Same as [`Expr::evaluate`].
    pub fn evaluate_bool<R: Record + ?Sized>(&self, record: &R) -> Result<bool, AutoruleError> {
        self.evaluate(record).map(|value| value.is_truthy())
    }
}

/// Evaluate every right-hand side against the unmodified record.
///
/// A later assignment to the same field wins.
///
/// # Errors
///
/// Returns the first evaluation error; nothing is collected in that case.
pub fn evaluate_assignments<R: Record + ?Sized>(
    assignments: &[Assignment],
    record: &R,
) -> Result<FieldMap, AutoruleError> {
    let mut values = FieldMap::new();
    for assignment in assignments {
        if !record.has_field(&assignment.field) {
            return Err(AutoruleError::UnknownField {
                model: record.model().display_name().to_string(),
                field: assignment.field.clone(),
            });
        }
        let value = assignment.value.evaluate(record)?;
        values.insert(assignment.field.clone(), value);
    }
    Ok(values)
}

fn apply_binary(
    op: BinaryOp,
    left: &FieldValue,
    right: &FieldValue,
) -> Result<FieldValue, AutoruleError> {
    match op {
        BinaryOp::Equal => Ok(FieldValue::Bool(left.loose_eq(right))),
        BinaryOp::NotEqual => Ok(FieldValue::Bool(!left.loose_eq(right))),
        BinaryOp::LessThan => ordering(left, right).map(|o| FieldValue::Bool(o.is_lt())),
        BinaryOp::LessThanOrEqual => ordering(left, right).map(|o| FieldValue::Bool(o.is_le())),
        BinaryOp::GreaterThan => ordering(left, right).map(|o| FieldValue::Bool(o.is_gt())),
        BinaryOp::GreaterThanOrEqual => {
            ordering(left, right).map(|o| FieldValue::Bool(o.is_ge()))
        },
        BinaryOp::In => membership(left, right).map(FieldValue::Bool),
        BinaryOp::NotIn => membership(left, right).map(|found| FieldValue::Bool(!found)),
        BinaryOp::Contains => Ok(FieldValue::Bool(contains(left, right))),
        BinaryOp::NotContains => Ok(FieldValue::Bool(!contains(left, right))),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            arithmetic(op, left, right)
        },
        BinaryOp::And | BinaryOp::Or => Ok(FieldValue::Bool(match op {
            BinaryOp::And => left.is_truthy() && right.is_truthy(),
            _ => left.is_truthy() || right.is_truthy(),
        })),
    }
}

fn ordering(left: &FieldValue, right: &FieldValue) -> Result<Ordering, AutoruleError> {
    left.compare(right).ok_or_else(|| {
        AutoruleError::Expression(format!(
            "Cannot order {} against {}",
            left.kind_name(),
            right.kind_name()
        ))
    })
}

fn membership(needle: &FieldValue, haystack: &FieldValue) -> Result<bool, AutoruleError> {
    let FieldValue::List(items) = haystack else {
        return Err(AutoruleError::Expression(format!(
            "IN expects a list, got {}",
            haystack.kind_name()
        )));
    };

    Ok(match needle {
        FieldValue::List(values) => values
            .iter()
            .any(|value| items.iter().any(|item| value.loose_eq(item))),
        value => items.iter().any(|item| value.loose_eq(item)),
    })
}

fn contains(haystack: &FieldValue, needle: &FieldValue) -> bool {
    match haystack {
        FieldValue::List(items) => items
            .iter()
            .any(|item| item.loose_eq(needle) || item.contains_text(&needle.to_text())),
        other => other.contains_text(&needle.to_text()),
    }
}

fn negate(value: &FieldValue) -> Result<FieldValue, AutoruleError> {
    match value {
        FieldValue::Integer(i) => i
            .checked_neg()
            .map(FieldValue::Integer)
            .ok_or_else(overflow),
        FieldValue::Decimal(d) => Ok(FieldValue::Decimal(-d)),
        other => Err(AutoruleError::Expression(format!(
            "Cannot negate {}",
            other.kind_name()
        ))),
    }
}

fn arithmetic(
    op: BinaryOp,
    left: &FieldValue,
    right: &FieldValue,
) -> Result<FieldValue, AutoruleError> {
    if let (BinaryOp::Add, FieldValue::Text(a), FieldValue::Text(b)) = (op, left, right) {
        return Ok(FieldValue::Text(format!("{a}{b}")));
    }

    if let (FieldValue::Integer(a), FieldValue::Integer(b)) = (left, right) {
        let (a, b) = (*a, *b);
        return match op {
            BinaryOp::Add => a.checked_add(b).map(FieldValue::Integer).ok_or_else(overflow),
            BinaryOp::Sub => a.checked_sub(b).map(FieldValue::Integer).ok_or_else(overflow),
            BinaryOp::Mul => a.checked_mul(b).map(FieldValue::Integer).ok_or_else(overflow),
            _ => {
                if b == 0 {
                    return Err(division_by_zero());
                }
                match (a.checked_rem(b), a.checked_div(b)) {
                    (Some(0), Some(quotient)) => Ok(FieldValue::Integer(quotient)),
                    _ => divide(left, right),
                }
            },
        };
    }

    match op {
        BinaryOp::Div => divide(left, right),
        _ => {
            let (a, b) = numbers(op, left, right)?;
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                _ => a * b,
            };
            finite(result)
        },
    }
}

fn divide(left: &FieldValue, right: &FieldValue) -> Result<FieldValue, AutoruleError> {
    let (a, b) = numbers(BinaryOp::Div, left, right)?;
    if b == 0.0 {
        return Err(division_by_zero());
    }
    finite(a / b)
}

fn numbers(
    op: BinaryOp,
    left: &FieldValue,
    right: &FieldValue,
) -> Result<(f64, f64), AutoruleError> {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(AutoruleError::Expression(format!(
            "Cannot apply {op:?} to {} and {}",
            left.kind_name(),
            right.kind_name()
        ))),
    }
}

fn finite(value: f64) -> Result<FieldValue, AutoruleError> {
    if value.is_finite() {
        Ok(FieldValue::Decimal(value))
    } else {
        Err(overflow())
    }
}

fn overflow() -> AutoruleError {
    AutoruleError::Expression("Numeric overflow".to_string())
}

fn division_by_zero() -> AutoruleError {
    AutoruleError::Expression("Division by zero".to_string())
}

fn call(function: Function, args: &[FieldValue]) -> Result<FieldValue, AutoruleError> {
    let first = args.first().cloned().unwrap_or_default();

    match function {
        Function::Lower => Ok(map_text(&first, |s| s.to_lowercase())),
        Function::Upper => Ok(map_text(&first, |s| s.to_uppercase())),
        Function::Trim => Ok(map_text(&first, |s| s.trim().to_string())),
        Function::Len => {
            let len = match &first {
                FieldValue::Null => 0,
                FieldValue::List(items) => items.len(),
                other => other.to_text().chars().count(),
            };
            i64::try_from(len).map(FieldValue::Integer).map_err(|_| overflow())
        },
        Function::Abs => match first {
            FieldValue::Integer(i) => i.checked_abs().map(FieldValue::Integer).ok_or_else(overflow),
            FieldValue::Decimal(d) => Ok(FieldValue::Decimal(d.abs())),
            FieldValue::Null => Ok(FieldValue::Null),
            other => Err(AutoruleError::Expression(format!(
                "abs() expects a number, got {}",
                other.kind_name()
            ))),
        },
        Function::Round => round(&first, args.get(1)),
        Function::Coalesce => Ok(args
            .iter()
            .find(|value| !value.is_null())
            .cloned()
            .unwrap_or_default()),
        Function::Concat => Ok(FieldValue::Text(
            args.iter().map(FieldValue::to_text).collect(),
        )),
    }
}

fn map_text(value: &FieldValue, f: impl Fn(&str) -> String) -> FieldValue {
    match value {
        FieldValue::Null => FieldValue::Null,
        other => FieldValue::Text(f(&other.to_text())),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn round(value: &FieldValue, digits: Option<&FieldValue>) -> Result<FieldValue, AutoruleError> {
    let digits = match digits {
        None => None,
        Some(FieldValue::Integer(d)) if (0..=12).contains(d) => Some(*d as i32),
        Some(other) => {
            return Err(AutoruleError::Expression(format!(
                "round() digits must be an integer between 0 and 12, got {other}"
            )))
        },
    };

    match (value, digits) {
        (FieldValue::Null, _) => Ok(FieldValue::Null),
        (FieldValue::Integer(i), _) => Ok(FieldValue::Integer(*i)),
        (FieldValue::Decimal(d), None) => {
            let rounded = d.round();
            if rounded.is_finite() && rounded.abs() < 9.0e15 {
                Ok(FieldValue::Integer(rounded as i64))
            } else {
                Err(overflow())
            }
        },
        (FieldValue::Decimal(d), Some(digits)) => {
            let factor = 10f64.powi(digits);
            finite((d * factor).round() / factor)
        },
        (other, _) => Err(AutoruleError::Expression(format!(
            "round() expects a number, got {}",
            other.kind_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::super::{parse_assignments, parse_expression};
    use super::*;
    use crate::core::Reference;
    use crate::records::{ModelRecord, TargetModel};

    fn courier() -> ModelRecord {
        let mut values = FieldMap::new();
        values.insert("name".to_string(), FieldValue::from("CR/0042"));
        values.insert("state".to_string(), FieldValue::from("draft"));
        values.insert("weight".to_string(), FieldValue::Decimal(12.5));
        values.insert("package_count".to_string(), FieldValue::Integer(3));
        values.insert(
            "priority_id".to_string(),
            FieldValue::Reference(Reference::named(2, "Urgent")),
        );
        values.insert(
            "tag_ids".to_string(),
            FieldValue::List(vec![
                FieldValue::Reference(Reference::named(4, "Fragile")),
                FieldValue::Reference(Reference::named(5, "Cold")),
            ]),
        );
        ModelRecord::with_values(TargetModel::CourierRequest, values).unwrap()
    }

    fn eval(source: &str) -> Result<FieldValue, AutoruleError> {
        parse_expression(source).unwrap().evaluate(&courier())
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("weight > 10").unwrap(), FieldValue::Bool(true));
        assert_eq!(eval("package_count <= 2").unwrap(), FieldValue::Bool(false));
        assert_eq!(eval("state == 'draft'").unwrap(), FieldValue::Bool(true));
        assert_eq!(eval("state <> 'draft'").unwrap(), FieldValue::Bool(false));
    }

    #[test]
    fn test_reference_compares_by_id_and_name() {
        assert_eq!(eval("priority_id = 2").unwrap(), FieldValue::Bool(true));
        assert_eq!(eval("priority_id = 'urgent'").unwrap(), FieldValue::Bool(true));
    }

    #[test]
    fn test_in_with_list_field() {
        assert_eq!(eval("tag_ids IN (5, 9)").unwrap(), FieldValue::Bool(true));
        assert_eq!(eval("tag_ids NOT IN [7]").unwrap(), FieldValue::Bool(true));
        assert_eq!(eval("state IN ['sent', 'done']").unwrap(), FieldValue::Bool(false));
    }

    #[test]
    fn test_contains_on_list_and_text() {
        assert_eq!(eval("tag_ids CONTAINS 'fragile'").unwrap(), FieldValue::Bool(true));
        assert_eq!(eval("name contains 'cr/'").unwrap(), FieldValue::Bool(true));
        assert_eq!(eval("name NOT CONTAINS '99'").unwrap(), FieldValue::Bool(true));
    }

    #[test]
    fn test_null_checks() {
        assert_eq!(eval("sender_id IS NULL").unwrap(), FieldValue::Bool(true));
        assert_eq!(eval("priority_id is not null").unwrap(), FieldValue::Bool(true));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("package_count * 2 + 1").unwrap(), FieldValue::Integer(7));
        assert_eq!(eval("package_count / 2").unwrap(), FieldValue::Decimal(1.5));
        assert_eq!(eval("weight - 2.5").unwrap(), FieldValue::Decimal(10.0));
        assert_eq!(eval("'CR' + '-' + state").unwrap(), FieldValue::from("CR-draft"));
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("upper(state)").unwrap(), FieldValue::from("DRAFT"));
        assert_eq!(eval("len(tag_ids)").unwrap(), FieldValue::Integer(2));
        assert_eq!(eval("round(weight)").unwrap(), FieldValue::Integer(13));
        assert_eq!(eval("round(2.346, 2)").unwrap(), FieldValue::Decimal(2.35));
        assert_eq!(eval("coalesce(sender_id, 7)").unwrap(), FieldValue::Integer(7));
        assert_eq!(
            eval("concat(name, ' #', package_count)").unwrap(),
            FieldValue::from("CR/0042 #3")
        );
        assert_eq!(eval("abs(-4)").unwrap(), FieldValue::Integer(4));
    }

    #[test]
    fn test_logical_short_circuit() {
        // The right side would fail on its own; OR never reaches it.
        assert_eq!(eval("state = 'draft' OR missing = 1").unwrap(), FieldValue::Bool(true));
        assert_eq!(eval("NOT weight > 100").unwrap(), FieldValue::Bool(true));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(eval("missing = 1"), Err(AutoruleError::UnknownField { .. })));
        assert!(eval("state > 3").is_err());
        assert!(eval("package_count / 0").is_err());
        assert!(eval("9223372036854775807 + 1").is_err());
        assert!(eval("state IN 'draft'").is_err());
    }

    #[test]
    fn test_assignments_read_original_values() {
        let record = courier();
        let assignments =
            parse_assignments("package_count := package_count + 1; weight := package_count * 2")
                .unwrap();
        let values = evaluate_assignments(&assignments, &record).unwrap();

        assert_eq!(values["package_count"], FieldValue::Integer(4));
        assert_eq!(values["weight"], FieldValue::Integer(6));
    }

    #[test]
    fn test_assignment_to_unknown_field() {
        let assignments = parse_assignments("colour := 'red'").unwrap();
        let result = evaluate_assignments(&assignments, &courier());
        assert!(matches!(result, Err(AutoruleError::UnknownField { .. })));
    }
}
