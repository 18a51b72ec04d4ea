//! SQLite persistence for records.
//!
//! Field values are stored as a JSON object per row.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::core::{FieldMap, Record};
use crate::error::AutoruleError;
use crate::storage::Database;

use super::{ModelRecord, TargetModel};

/// Record store backed by the `records` table.
pub struct RecordStore {
    db: Database,
}

impl RecordStore {
    /// Open the store at the default database location.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn new() -> Result<Self, AutoruleError> {
        Ok(Self {
            db: Database::open()?,
        })
    }

    /// Create a store with an existing database connection.
    #[must_use]
    pub const fn with_database(db: Database) -> Self {
        Self { db }
    }

    /// Insert a transient record and assign its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record already has an id or the insert fails.
    pub fn insert(&self, record: &mut ModelRecord) -> Result<i64, AutoruleError> {
        if record.id.is_some() {
            return Err(AutoruleError::Validation(format!(
                "Record {} is already stored",
                record.display_name()
            )));
        }

        let now = Utc::now();
        let fields = serde_json::to_string(record.values())?;
        let conn = self.db.connection();

        conn.execute(
            r"INSERT INTO records (model, fields, created_at, updated_at)
              VALUES (?1, ?2, ?3, ?4)",
            params![record.model.key(), fields, now.to_rfc3339(), now.to_rfc3339()],
        )
        .map_err(|e| AutoruleError::Database(format!("Failed to insert record: {e}")))?;

        let id = conn.last_insert_rowid();
        record.id = Some(id);
        record.created_at = Some(now);
        record.updated_at = Some(now);
        Ok(id)
    }

    /// Save a stored record's current values.
    ///
    /// # Errors
    ///
    /// Returns an error if the record was never inserted or the update fails.
    pub fn update(&self, record: &ModelRecord) -> Result<(), AutoruleError> {
        let id = record
            .id()
            .ok_or_else(|| AutoruleError::Validation("Cannot update an unsaved record".to_string()))?;
        let fields = serde_json::to_string(record.values())?;
        let updated_at = record.updated_at.unwrap_or_else(Utc::now);

        let changed = self
            .db
            .connection()
            .execute(
                "UPDATE records SET fields = ?1, updated_at = ?2 WHERE id = ?3",
                params![fields, updated_at.to_rfc3339(), id],
            )
            .map_err(|e| AutoruleError::Database(format!("Failed to update record: {e}")))?;

        if changed == 0 {
            return Err(AutoruleError::NotFound(format!("Record {id}")));
        }
        Ok(())
    }

    /// Load a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get(&self, id: i64) -> Result<Option<ModelRecord>, AutoruleError> {
        let mut stmt = self
            .db
            .connection()
            .prepare("SELECT id, model, fields, created_at, updated_at FROM records WHERE id = ?1")
            .map_err(|e| AutoruleError::Database(format!("Failed to prepare query: {e}")))?;

        let row = stmt
            .query_row([id], read_row)
            .optional()
            .map_err(|e| AutoruleError::Database(format!("Failed to query record: {e}")))?;

        row.map(into_record).transpose()
    }

    /// List records, optionally of one model, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list(&self, model: Option<TargetModel>) -> Result<Vec<ModelRecord>, AutoruleError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(
                r"SELECT id, model, fields, created_at, updated_at
                  FROM records
                  WHERE ?1 IS NULL OR model = ?1
                  ORDER BY id DESC",
            )
            .map_err(|e| AutoruleError::Database(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([model.map(|m| m.key())], read_row)
            .map_err(|e| AutoruleError::Database(format!("Failed to query records: {e}")))?;

        let mut records = Vec::new();
        for row in rows {
            let row = row.map_err(|e| AutoruleError::Database(e.to_string()))?;
            records.push(into_record(row)?);
        }
        Ok(records)
    }
}

type StoredRow = (i64, String, String, String, String);

fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_record((id, model, fields, created_at, updated_at): StoredRow) -> Result<ModelRecord, AutoruleError> {
    let model: TargetModel = model.parse()?;
    let fields: FieldMap = serde_json::from_str(&fields)?;
    Ok(ModelRecord::restore(
        id,
        model,
        fields,
        parse_timestamp(&created_at),
        parse_timestamp(&updated_at),
    ))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FieldValue;

    fn store() -> RecordStore {
        RecordStore::with_database(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_insert_and_get() {
        let store = store();
        let mut values = FieldMap::new();
        values.insert("name".to_string(), FieldValue::from("CR/0001"));
        values.insert("weight".to_string(), FieldValue::Decimal(2.5));
        let mut record = ModelRecord::with_values(TargetModel::CourierRequest, values).unwrap();

        let id = store.insert(&mut record).unwrap();
        let loaded = store.get(id).unwrap().unwrap();

        assert_eq!(loaded.get("name"), Some(FieldValue::from("CR/0001")));
        assert_eq!(loaded.get("weight"), Some(FieldValue::Decimal(2.5)));
        assert!(loaded.created_at.is_some());
    }

    #[test]
    fn test_update_persists_changes() {
        let store = store();
        let mut record = ModelRecord::blank(TargetModel::Partner);
        store.insert(&mut record).unwrap();

        let mut values = FieldMap::new();
        values.insert("city".to_string(), FieldValue::from("Lyon"));
        record.write(values).unwrap();
        store.update(&record).unwrap();

        let loaded = store.get(record.id().unwrap()).unwrap().unwrap();
        assert_eq!(loaded.get("city"), Some(FieldValue::from("Lyon")));
    }

    #[test]
    fn test_list_filters_by_model() {
        let store = store();
        store.insert(&mut ModelRecord::blank(TargetModel::Partner)).unwrap();
        store.insert(&mut ModelRecord::blank(TargetModel::Invoice)).unwrap();
        store.insert(&mut ModelRecord::blank(TargetModel::Invoice)).unwrap();

        assert_eq!(store.list(None).unwrap().len(), 3);
        assert_eq!(store.list(Some(TargetModel::Invoice)).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_record() {
        assert!(store().get(42).unwrap().is_none());
    }
}
