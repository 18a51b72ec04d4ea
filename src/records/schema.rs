//! Field schemas for each target model.
//!
//! A schema fixes the field names a model exposes, the kind of each field
//! and what a blank (never saved) record holds.

use crate::core::coerce_collection;
use crate::core::{FieldValue, Reference};
use crate::error::AutoruleError;

use super::TargetModel;

/// Storage kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// True/false flag.
    Boolean,
    /// Whole number.
    Integer,
    /// Floating-point number.
    Decimal,
    /// Free text.
    Text,
    /// Reference to a single record.
    Reference,
    /// References to many records.
    ReferenceList,
}

impl FieldKind {
    /// Get display name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Text => "text",
            Self::Reference => "reference",
            Self::ReferenceList => "reference list",
        }
    }

    /// Value a blank record holds for this kind.
    #[must_use]
    pub fn blank(&self) -> FieldValue {
        match self {
            Self::Boolean => FieldValue::Bool(false),
            Self::Integer => FieldValue::Integer(0),
            Self::Decimal => FieldValue::Decimal(0.0),
            Self::ReferenceList => FieldValue::List(Vec::new()),
            Self::Text | Self::Reference => FieldValue::Null,
        }
    }

    /// Normalize a value for storage in a field of this kind.
    ///
    /// Null resets the field to its blank value. Integer ids and numeric text
    /// are accepted for references.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the value cannot be stored in this kind.
    pub fn accept(&self, field: &str, value: FieldValue) -> Result<FieldValue, AutoruleError> {
        let mismatch = |found: &FieldValue| AutoruleError::TypeMismatch {
            field: field.to_string(),
            expected: self.name(),
            found: found.kind_name(),
        };

        if value.is_null() {
            return Ok(self.blank());
        }

        match self {
            Self::Boolean => match value {
                FieldValue::Bool(_) => Ok(value),
                FieldValue::Text(ref s) => match s.trim().to_lowercase().as_str() {
                    "true" | "1" | "yes" => Ok(FieldValue::Bool(true)),
                    "false" | "0" | "no" => Ok(FieldValue::Bool(false)),
                    _ => Err(mismatch(&value)),
                },
                other => Err(mismatch(&other)),
            },
            Self::Integer => match value {
                FieldValue::Integer(_) => Ok(value),
                FieldValue::Text(ref s) => s
                    .trim()
                    .parse::<i64>()
                    .map(FieldValue::Integer)
                    .map_err(|_| mismatch(&value)),
                other => Err(mismatch(&other)),
            },
            // NaN and infinities do not survive the JSON column.
            Self::Decimal => match value {
                FieldValue::Decimal(n) if n.is_finite() => Ok(value),
                FieldValue::Integer(_) => Ok(FieldValue::Decimal(value.as_number().unwrap_or_default())),
                FieldValue::Text(ref s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(FieldValue::Decimal)
                    .ok_or_else(|| mismatch(&value)),
                other => Err(mismatch(&other)),
            },
            Self::Text => match value {
                FieldValue::Text(_) => Ok(value),
                FieldValue::Bool(_) | FieldValue::Integer(_) | FieldValue::Decimal(_) => {
                    Ok(FieldValue::Text(value.to_text()))
                },
                other => Err(mismatch(&other)),
            },
            Self::Reference => to_reference(&value).ok_or_else(|| mismatch(&value)),
            Self::ReferenceList => {
                let items = match value {
                    FieldValue::List(items) => items,
                    FieldValue::Text(ref s) => coerce_collection(&FieldValue::Integer(0), s),
                    FieldValue::Reference(_) | FieldValue::Integer(_) => vec![value.clone()],
                    ref other => return Err(mismatch(other)),
                };
                items
                    .iter()
                    .map(|item| to_reference(item).ok_or_else(|| mismatch(item)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(FieldValue::List)
            },
        }
    }
}

fn to_reference(value: &FieldValue) -> Option<FieldValue> {
    match value {
        FieldValue::Reference(_) => Some(value.clone()),
        FieldValue::Integer(id) => Some(FieldValue::Reference(Reference::new(*id))),
        FieldValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .map(|id| FieldValue::Reference(Reference::new(id))),
        _ => None,
    }
}

/// A field declared by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Technical name.
    pub name: &'static str,
    /// Storage kind.
    pub kind: FieldKind,
    /// Human label.
    pub label: &'static str,
}

const fn spec(name: &'static str, kind: FieldKind, label: &'static str) -> FieldSpec {
    FieldSpec { name, kind, label }
}

const COURIER_REQUEST: &[FieldSpec] = &[
    spec("name", FieldKind::Text, "Reference"),
    spec("state", FieldKind::Text, "Status"),
    spec("user_id", FieldKind::Reference, "Responsible"),
    spec("sender_id", FieldKind::Reference, "Sender"),
    spec("receiver_id", FieldKind::Reference, "Receiver"),
    spec("courier_type_id", FieldKind::Reference, "Courier Type"),
    spec("category_id", FieldKind::Reference, "Category"),
    spec("priority_id", FieldKind::Reference, "Priority"),
    spec("tag_ids", FieldKind::ReferenceList, "Tags"),
    spec("weight", FieldKind::Decimal, "Weight"),
    spec("package_count", FieldKind::Integer, "Packages"),
    spec("notes", FieldKind::Text, "Notes"),
    spec("auto_filled", FieldKind::Boolean, "Auto Filled"),
];

const PARTNER: &[FieldSpec] = &[
    spec("name", FieldKind::Text, "Name"),
    spec("email", FieldKind::Text, "Email"),
    spec("phone", FieldKind::Text, "Phone"),
    spec("city", FieldKind::Text, "City"),
    spec("is_company", FieldKind::Boolean, "Is a Company"),
    spec("courier", FieldKind::Boolean, "Courier Contact"),
    spec("customer_rank", FieldKind::Integer, "Customer Rank"),
    spec("credit_limit", FieldKind::Decimal, "Credit Limit"),
    spec("user_id", FieldKind::Reference, "Salesperson"),
];

const SALES_ORDER: &[FieldSpec] = &[
    spec("name", FieldKind::Text, "Order Reference"),
    spec("state", FieldKind::Text, "Status"),
    spec("partner_id", FieldKind::Reference, "Customer"),
    spec("user_id", FieldKind::Reference, "Salesperson"),
    spec("amount_total", FieldKind::Decimal, "Total"),
    spec("line_count", FieldKind::Integer, "Lines"),
    spec("invoice_status", FieldKind::Text, "Invoice Status"),
    spec("note", FieldKind::Text, "Terms and Conditions"),
];

const INVOICE: &[FieldSpec] = &[
    spec("name", FieldKind::Text, "Number"),
    spec("state", FieldKind::Text, "Status"),
    spec("partner_id", FieldKind::Reference, "Customer"),
    spec("user_id", FieldKind::Reference, "Salesperson"),
    spec("move_type", FieldKind::Text, "Type"),
    spec("amount_total", FieldKind::Decimal, "Total"),
    spec("amount_residual", FieldKind::Decimal, "Amount Due"),
    spec("payment_state", FieldKind::Text, "Payment Status"),
    spec("is_move_sent", FieldKind::Boolean, "Sent"),
];

/// All fields declared by a model.
#[must_use]
pub const fn fields(model: TargetModel) -> &'static [FieldSpec] {
    match model {
        TargetModel::CourierRequest => COURIER_REQUEST,
        TargetModel::Partner => PARTNER,
        TargetModel::SalesOrder => SALES_ORDER,
        TargetModel::Invoice => INVOICE,
    }
}

/// Look up a single field.
#[must_use]
pub fn field(model: TargetModel, name: &str) -> Option<&'static FieldSpec> {
    fields(model).iter().find(|f| f.name == name)
}
