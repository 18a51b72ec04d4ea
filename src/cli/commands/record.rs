//! Record command implementation.

use crate::cli::args::{OutputFormat, RecordCommands};
use crate::core::{FieldMap, FieldValue};
use crate::error::AutoruleError;
use crate::features::autofill::{PreferenceStore, FILLED_FIELDS};
use crate::features::automation::{AutomationEngine, EngineConfig, RuleStorage};
use crate::features::lifecycle::{RecordService, SavedRecord};
use crate::output::{
    format_defaults_pretty, format_record, format_records, format_saved_pretty, to_json,
};
use crate::records::RecordStore;

/// Execute record subcommands.
///
/// # Errors
///
/// Returns an error if a store cannot be opened or the command fails.
pub fn record(
    cmd: RecordCommands,
    config: EngineConfig,
    user: Option<i64>,
    format: OutputFormat,
) -> Result<String, AutoruleError> {
    let service = |dry_run: bool| -> Result<RecordService, AutoruleError> {
        let config = EngineConfig {
            dry_run: config.dry_run || dry_run,
            ..config.clone()
        };
        Ok(RecordService::new(
            RecordStore::new()?,
            PreferenceStore::new()?,
            AutomationEngine::with_storage(RuleStorage::new()?, config),
        ))
    };

    match cmd {
        RecordCommands::Create {
            model,
            values,
            dry_run,
        } => {
            let saved = service(dry_run)?.create(model, field_map(values), user)?;
            format_saved(&saved, format)
        },
        RecordCommands::Update {
            id,
            values,
            dry_run,
        } => {
            let saved = service(dry_run)?.update(id, field_map(values), user)?;
            format_saved(&saved, format)
        },
        RecordCommands::Show { id } => {
            let record = RecordStore::new()?
                .get(id)?
                .ok_or_else(|| AutoruleError::NotFound(format!("Record {id}")))?;
            format_record(&record, format)
        },
        RecordCommands::List { model } => format_records(&RecordStore::new()?.list(model)?, format),
        RecordCommands::Defaults { model, fields } => {
            let requested: Vec<&str> = fields.as_ref().map_or_else(
                || FILLED_FIELDS.to_vec(),
                |f| f.iter().map(String::as_str).collect(),
            );
            let defaults = service(false)?.default_values(model, &requested, user)?;
            match format {
                OutputFormat::Json => to_json(&defaults),
                OutputFormat::Pretty => Ok(format_defaults_pretty(&defaults)),
            }
        },
    }
}

fn format_saved(saved: &SavedRecord, format: OutputFormat) -> Result<String, AutoruleError> {
    match format {
        OutputFormat::Json => to_json(saved),
        OutputFormat::Pretty => Ok(format_saved_pretty(saved)),
    }
}

/// Turn `FIELD=VALUE` pairs into field values; an empty value clears the field.
fn field_map(pairs: Vec<(String, String)>) -> FieldMap {
    pairs
        .into_iter()
        .map(|(field, value)| {
            let value = if value.is_empty() {
                FieldValue::Null
            } else {
                FieldValue::Text(value)
            };
            (field, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_map() {
        let map = field_map(vec![
            ("city".to_string(), "Lyon".to_string()),
            ("phone".to_string(), String::new()),
        ]);

        assert_eq!(map.get("city"), Some(&FieldValue::from("Lyon")));
        assert_eq!(map.get("phone"), Some(&FieldValue::Null));
    }
}
