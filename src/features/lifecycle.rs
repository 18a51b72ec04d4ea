//! Record create and edit with auto-fill and rules.
//!
//! This is the host side of the engine: it decides when rules run and which
//! user they run for.

use chrono::Utc;
use serde::Serialize;

use crate::core::{FieldMap, Record};
use crate::error::AutoruleError;
use crate::features::autofill::{AutoFill, PreferenceStore};
use crate::features::automation::{AutomationEngine, EngineResult};
use crate::records::{ModelRecord, RecordStore, TargetModel};

/// A stored record together with what happened to it.
#[derive(Debug, Serialize)]
pub struct SavedRecord {
    /// The record as stored
    pub record: ModelRecord,
    /// Fields copied from user defaults
    pub auto_filled: Vec<&'static str>,
    /// Rule engine result, `None` if rules could not be loaded
    pub engine: Option<EngineResult>,
}

/// Creates and edits records.
pub struct RecordService {
    records: RecordStore,
    preferences: PreferenceStore,
    engine: AutomationEngine,
}

impl RecordService {
    /// Create a service from its parts.
    #[must_use]
    pub const fn new(
        records: RecordStore,
        preferences: PreferenceStore,
        engine: AutomationEngine,
    ) -> Self {
        Self {
            records,
            preferences,
            engine,
        }
    }

    /// Get the record store.
    #[must_use]
    pub const fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Get the preference store.
    #[must_use]
    pub const fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    /// Get the automation engine.
    #[must_use]
    pub const fn engine(&self) -> &AutomationEngine {
        &self.engine
    }

    /// Create a record.
    ///
    /// Courier requests are auto-filled first. Rules for the record's owner
    /// run before the record is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the values do not fit the model or the record
    /// cannot be stored.
    pub fn create(
        &self,
        model: TargetModel,
        mut values: FieldMap,
        current_user: Option<i64>,
    ) -> Result<SavedRecord, AutoruleError> {
        let auto_filled = if model == TargetModel::CourierRequest {
            AutoFill::new(&self.preferences).on_create(&mut values, current_user)?
        } else {
            Vec::new()
        };

        let mut record = ModelRecord::with_values(model, values)?;
        let engine = self.run_rules(&mut record, current_user);
        self.records.insert(&mut record)?;

        tracing::info!(
            model = %model,
            id = record.id,
            auto_filled = auto_filled.len(),
            "Created record"
        );

        Ok(SavedRecord {
            record,
            auto_filled,
            engine,
        })
    }

    /// Edit a stored record.
    ///
    /// When the responsible user of a courier request changes, the new
    /// user's defaults fill its empty fields. Rules run before saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not exist, the values do not fit
    /// or the record cannot be saved.
    pub fn update(
        &self,
        id: i64,
        values: FieldMap,
        current_user: Option<i64>,
    ) -> Result<SavedRecord, AutoruleError> {
        let mut record = self
            .records
            .get(id)?
            .ok_or_else(|| AutoruleError::NotFound(format!("Record {id}")))?;

        let previous_owner = record.owner();
        record.write(values)?;

        let auto_filled =
            if record.model == TargetModel::CourierRequest && record.owner() != previous_owner {
                AutoFill::new(&self.preferences).on_user_change(&mut record, current_user)?
            } else {
                Vec::new()
            };

        let engine = self.run_rules(&mut record, current_user);
        record.updated_at = Some(Utc::now());
        self.records.update(&record)?;

        tracing::info!(model = %record.model, id, "Updated record");

        Ok(SavedRecord {
            record,
            auto_filled,
            engine,
        })
    }

    /// Default values for a new record's form.
    ///
    /// Only courier requests have user defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if preferences cannot be loaded.
    pub fn default_values(
        &self,
        model: TargetModel,
        requested: &[&str],
        current_user: Option<i64>,
    ) -> Result<FieldMap, AutoruleError> {
        if model != TargetModel::CourierRequest {
            return Ok(FieldMap::new());
        }
        AutoFill::new(&self.preferences).default_values(requested, FieldMap::new(), current_user)
    }

    fn run_rules(&self, record: &mut ModelRecord, current_user: Option<i64>) -> Option<EngineResult> {
        let owner = record.owner().or(current_user);
        match self.engine.run_for_owner(record, owner) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(error = %e, "Rules not run");
                None
            },
        }
    }
}
