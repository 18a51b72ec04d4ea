//! Filling courier requests from the owner's defaults.
//!
//! Three entry points mirror the moments a request's values are decided:
//! when it is created, when an empty form asks for defaults, and when the
//! responsible user changes.

use crate::core::{FieldMap, FieldValue, Record};
use crate::error::AutoruleError;

use super::preferences::{PreferenceStore, UserPreferences};

/// Flag set on a request whose values were filled on create.
pub const AUTO_FILLED_FIELD: &str = "auto_filled";

const USER_FIELD: &str = "user_id";

/// Auto-fill over a preference store.
pub struct AutoFill<'a> {
    preferences: &'a PreferenceStore,
}

impl<'a> AutoFill<'a> {
    /// Create an auto-fill reading from `preferences`.
    #[must_use]
    pub const fn new(preferences: &'a PreferenceStore) -> Self {
        Self { preferences }
    }

    /// Fill incoming values of a new courier request.
    ///
    /// A missing `user_id` becomes `current_user`. When that user has
    /// auto-fill on, every unset default field is copied in and
    /// `auto_filled` is set. Returns the names of the copied fields.
    ///
    /// # Errors
    ///
    /// Returns an error if preferences cannot be loaded.
    pub fn on_create(
        &self,
        values: &mut FieldMap,
        current_user: Option<i64>,
    ) -> Result<Vec<&'static str>, AutoruleError> {
        if !is_set(values.get(USER_FIELD)) {
            if let Some(user) = current_user {
                values.insert(USER_FIELD.to_string(), FieldValue::Integer(user));
            }
        }

        let Some(user) = values.get(USER_FIELD).and_then(value_id) else {
            return Ok(Vec::new());
        };

        let prefs = self.preferences.get(user)?;
        let filled = fill_unset(&prefs, |field| is_set(values.get(field)));
        let copied: Vec<&'static str> = filled.iter().map(|(field, _)| *field).collect();

        for (field, value) in filled {
            values.insert(field.to_string(), value);
        }
        if !copied.is_empty() {
            values.insert(AUTO_FILLED_FIELD.to_string(), FieldValue::Bool(true));
        }

        tracing::debug!(user, fields = ?copied, "Auto-filled courier request");
        Ok(copied)
    }

    /// Defaults for a blank courier request form.
    ///
    /// The user is taken from `defaults` or falls back to `current_user`.
    /// Only requested fields that `defaults` does not already provide are
    /// added.
    ///
    /// # Errors
    ///
    /// Returns an error if preferences cannot be loaded.
    pub fn default_values(
        &self,
        requested: &[&str],
        mut defaults: FieldMap,
        current_user: Option<i64>,
    ) -> Result<FieldMap, AutoruleError> {
        let user = defaults.get(USER_FIELD).and_then(value_id).or(current_user);
        let Some(user) = user else {
            return Ok(defaults);
        };

        let prefs = self.preferences.get(user)?;
        let filled = fill_unset(&prefs, |field| {
            !requested.contains(&field) || is_set(defaults.get(field))
        });

        for (field, value) in filled {
            defaults.insert(field.to_string(), value);
        }
        Ok(defaults)
    }

    /// Apply the new responsible user's defaults to a courier request.
    ///
    /// Uses the record's owner, or `current_user` when it has none. Only
    /// unset fields are filled; `auto_filled` is left alone. Returns the
    /// names of the filled fields.
    ///
    /// # Errors
    ///
    /// Returns an error if preferences cannot be loaded or the record
    /// refuses the write.
    pub fn on_user_change<R: Record + ?Sized>(
        &self,
        record: &mut R,
        current_user: Option<i64>,
    ) -> Result<Vec<&'static str>, AutoruleError> {
        let Some(user) = record.owner().or(current_user) else {
            return Ok(Vec::new());
        };

        let prefs = self.preferences.get(user)?;
        let filled = fill_unset(&prefs, |field| is_set(record.get(field).as_ref()));
        let copied: Vec<&'static str> = filled.iter().map(|(field, _)| *field).collect();

        if !filled.is_empty() {
            let values: FieldMap = filled
                .into_iter()
                .map(|(field, value)| (field.to_string(), value))
                .collect();
            record.write(values)?;
        }

        Ok(copied)
    }
}

/// Defaults of an active user for the fields `is_taken` rejects.
fn fill_unset(
    prefs: &UserPreferences,
    is_taken: impl Fn(&str) -> bool,
) -> Vec<(&'static str, FieldValue)> {
    if !prefs.is_active() {
        return Vec::new();
    }
    prefs
        .defaults()
        .into_iter()
        .filter(|(field, _)| !is_taken(field))
        .collect()
}

fn is_set(value: Option<&FieldValue>) -> bool {
    value.is_some_and(FieldValue::is_truthy)
}

fn value_id(value: &FieldValue) -> Option<i64> {
    match value {
        FieldValue::Text(s) => s.trim().parse().ok(),
        other => other.as_reference_id(),
    }
}
