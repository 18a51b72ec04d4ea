//! Per-user default values for courier requests.

use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::core::{FieldValue, Reference};
use crate::error::AutoruleError;
use crate::storage::Database;

/// Courier request fields that user defaults can fill, in fill order.
pub const FILLED_FIELDS: [&str; 5] = [
    "sender_id",
    "courier_type_id",
    "category_id",
    "priority_id",
    "tag_ids",
];

/// Auto-fill preferences of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserPreferences {
    /// User these preferences belong to
    pub user_id: i64,
    /// Fill courier requests from the defaults below
    pub auto_fill: bool,
    /// Master switch for automation features
    pub automation_enabled: bool,
    /// Default sender partner
    pub default_sender_id: Option<i64>,
    /// Default courier type
    pub default_courier_type_id: Option<i64>,
    /// Default category
    pub default_category_id: Option<i64>,
    /// Default priority
    pub default_priority_id: Option<i64>,
    /// Default tags
    pub default_tag_ids: Vec<i64>,
}

impl UserPreferences {
    /// Preferences with everything off.
    #[must_use]
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    /// Whether auto-fill applies for this user.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.auto_fill && self.automation_enabled
    }

    /// Configured defaults keyed by the courier request field they fill.
    ///
    /// Unset defaults and an empty tag list are left out.
    #[must_use]
    pub fn defaults(&self) -> Vec<(&'static str, FieldValue)> {
        let single = [
            ("sender_id", self.default_sender_id),
            ("courier_type_id", self.default_courier_type_id),
            ("category_id", self.default_category_id),
            ("priority_id", self.default_priority_id),
        ];

        let mut defaults: Vec<(&'static str, FieldValue)> = single
            .into_iter()
            .filter_map(|(field, id)| id.map(|id| (field, FieldValue::Reference(Reference::new(id)))))
            .collect();

        if !self.default_tag_ids.is_empty() {
            let tags = self
                .default_tag_ids
                .iter()
                .map(|id| FieldValue::Reference(Reference::new(*id)))
                .collect();
            defaults.push(("tag_ids", FieldValue::List(tags)));
        }

        defaults
    }
}

/// Preference store backed by the `user_preferences` table.
pub struct PreferenceStore {
    db: Database,
}

impl PreferenceStore {
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

    /// Load a user's preferences, or the all-off defaults if none are saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or stored tags are malformed.
    pub fn get(&self, user_id: i64) -> Result<UserPreferences, AutoruleError> {
        let mut stmt = self
            .db
            .connection()
            .prepare(
                r"SELECT user_id, auto_fill, automation_enabled, default_sender_id,
                         default_courier_type_id, default_category_id,
                         default_priority_id, default_tag_ids
                  FROM user_preferences
                  WHERE user_id = ?1",
            )
            .map_err(|e| AutoruleError::Database(format!("Failed to prepare query: {e}")))?;

        let row = stmt
            .query_row([user_id], read_row)
            .optional()
            .map_err(|e| AutoruleError::Database(format!("Failed to query preferences: {e}")))?;

        row.map_or_else(|| Ok(UserPreferences::new(user_id)), into_preferences)
    }

    /// Save a user's preferences, replacing any previous ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save(&self, prefs: &UserPreferences) -> Result<(), AutoruleError> {
        let tags = serde_json::to_string(&prefs.default_tag_ids)?;

        self.db
            .connection()
            .execute(
                r"INSERT OR REPLACE INTO user_preferences
                  (user_id, auto_fill, automation_enabled, default_sender_id,
                   default_courier_type_id, default_category_id,
                   default_priority_id, default_tag_ids)
                  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    prefs.user_id,
                    prefs.auto_fill,
                    prefs.automation_enabled,
                    prefs.default_sender_id,
                    prefs.default_courier_type_id,
                    prefs.default_category_id,
                    prefs.default_priority_id,
                    tags,
                ],
            )
            .map_err(|e| AutoruleError::Database(format!("Failed to save preferences: {e}")))?;

        Ok(())
    }
}

type StoredRow = (
    i64,
    bool,
    bool,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    String,
);

fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn into_preferences(row: StoredRow) -> Result<UserPreferences, AutoruleError> {
    let (user_id, auto_fill, automation_enabled, sender, courier_type, category, priority, tags) =
        row;
    Ok(UserPreferences {
        user_id,
        auto_fill,
        automation_enabled,
        default_sender_id: sender,
        default_courier_type_id: courier_type,
        default_category_id: category,
        default_priority_id: priority,
        default_tag_ids: serde_json::from_str(&tags)?,
    })
}
