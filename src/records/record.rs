//! Schema-checked record adapter.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{FieldMap, FieldValue, Record};
use crate::error::AutoruleError;

use super::schema::{self, FieldSpec};
use super::TargetModel;

/// A record of one of the target models.
///
/// Field access is checked against the model's schema: reads of undeclared
/// fields return `None` and writes to them are refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Persistent id, `None` until stored.
    pub id: Option<i64>,
    /// Record kind.
    pub model: TargetModel,
    /// Current field values.
    values: BTreeMap<String, FieldValue>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub updated_at: Option<DateTime<Utc>>,
}

impl ModelRecord {
    /// Create a transient record with every field at its blank value.
    #[must_use]
    pub fn blank(model: TargetModel) -> Self {
        let values = schema::fields(model)
            .iter()
            .map(|f| (f.name.to_string(), f.kind.blank()))
            .collect();

        Self {
            id: None,
            model,
            values,
            created_at: None,
            updated_at: None,
        }
    }

    /// Create a transient record from initial values.
    ///
    /// # Errors
    ///
    /// Returns an error if a value names an unknown field or does not fit.
    pub fn with_values(model: TargetModel, values: FieldMap) -> Result<Self, AutoruleError> {
        let mut record = Self::blank(model);
        record.write(values)?;
        Ok(record)
    }

    /// Restore a stored record. Unknown stored fields are dropped.
    #[must_use]
    pub fn restore(
        id: i64,
        model: TargetModel,
        stored: FieldMap,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        let mut record = Self::blank(model);
        for (name, value) in stored {
            if let Some(spec) = schema::field(model, &name) {
                if let Ok(value) = spec.kind.accept(&name, value) {
                    record.values.insert(name, value);
                }
            }
        }
        record.id = Some(id);
        record.created_at = created_at;
        record.updated_at = updated_at;
        record
    }

    /// All field values, in name order.
    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }

    /// Declared fields of this record's model.
    #[must_use]
    pub const fn schema(&self) -> &'static [FieldSpec] {
        schema::fields(self.model)
    }

    /// Get the display name (the `name` field).
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.values.get("name") {
            Some(FieldValue::Text(name)) if !name.is_empty() => name.clone(),
            _ => self
                .id
                .map_or_else(|| format!("New {}", self.model), |id| format!("{},{id}", self.model.key())),
        }
    }

    fn unknown(&self, field: &str) -> AutoruleError {
        AutoruleError::UnknownField {
            model: self.model.display_name().to_string(),
            field: field.to_string(),
        }
    }
}

impl Record for ModelRecord {
    fn model(&self) -> TargetModel {
        self.model
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn get(&self, field: &str) -> Option<FieldValue> {
        self.values.get(field).cloned()
    }

    fn has_field(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    fn write(&mut self, values: FieldMap) -> Result<(), AutoruleError> {
        let mut normalized = Vec::with_capacity(values.len());
        for (name, value) in values {
            let spec = schema::field(self.model, &name).ok_or_else(|| self.unknown(&name))?;
            let value = spec.kind.accept(&name, value)?;
            normalized.push((name, value));
        }

        self.values.extend(normalized);
        if self.id.is_some() {
            self.updated_at = Some(Utc::now());
        }
        Ok(())
    }
}
