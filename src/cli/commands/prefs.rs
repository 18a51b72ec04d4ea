//! Preference command implementation.

use crate::cli::args::{OutputFormat, PrefsCommands};
use crate::error::AutoruleError;
use crate::features::autofill::{PreferenceStore, UserPreferences};
use crate::output::{format_preferences_pretty, to_json};

/// Changes requested by `prefs set`.
#[derive(Debug, Default)]
pub struct PreferenceChanges {
    /// New auto-fill toggle
    pub auto_fill: Option<bool>,
    /// New automation toggle
    pub automation: Option<bool>,
    /// New sender (`none` clears)
    pub sender: Option<String>,
    /// New courier type (`none` clears)
    pub courier_type: Option<String>,
    /// New category (`none` clears)
    pub category: Option<String>,
    /// New priority (`none` clears)
    pub priority: Option<String>,
    /// New tag list (`none` clears)
    pub tags: Option<String>,
}

impl PreferenceChanges {
    /// Apply the changes to `prefs`.
    ///
    /// # Errors
    ///
    /// Returns an error if an id is not a number.
    pub fn apply(self, prefs: &mut UserPreferences) -> Result<(), AutoruleError> {
        if let Some(flag) = self.auto_fill {
            prefs.auto_fill = flag;
        }
        if let Some(flag) = self.automation {
            prefs.automation_enabled = flag;
        }
        if let Some(text) = self.sender {
            prefs.default_sender_id = parse_id("sender", &text)?;
        }
        if let Some(text) = self.courier_type {
            prefs.default_courier_type_id = parse_id("courier type", &text)?;
        }
        if let Some(text) = self.category {
            prefs.default_category_id = parse_id("category", &text)?;
        }
        if let Some(text) = self.priority {
            prefs.default_priority_id = parse_id("priority", &text)?;
        }
        if let Some(text) = self.tags {
            prefs.default_tag_ids = parse_ids(&text)?;
        }
        Ok(())
    }
}

/// Execute preference subcommands.
///
/// # Errors
///
/// Returns an error if no user is given or the store fails.
pub fn prefs(
    cmd: PrefsCommands,
    user: Option<i64>,
    format: OutputFormat,
) -> Result<String, AutoruleError> {
    let user = user.ok_or_else(|| {
        AutoruleError::Validation(
            "No user given: pass --user or set general.current_user".to_string(),
        )
    })?;
    let store = PreferenceStore::new()?;

    let prefs = match cmd {
        PrefsCommands::Show => store.get(user)?,
        PrefsCommands::Set {
            auto_fill,
            automation,
            sender,
            courier_type,
            category,
            priority,
            tags,
        } => {
            let mut prefs = store.get(user)?;
            PreferenceChanges {
                auto_fill,
                automation,
                sender,
                courier_type,
                category,
                priority,
                tags,
            }
            .apply(&mut prefs)?;
            store.save(&prefs)?;
            prefs
        },
    };

    match format {
        OutputFormat::Json => to_json(&prefs),
        OutputFormat::Pretty => Ok(format_preferences_pretty(&prefs)),
    }
}

fn is_clear(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text.eq_ignore_ascii_case("none")
}

fn parse_id(what: &str, text: &str) -> Result<Option<i64>, AutoruleError> {
    if is_clear(text) {
        return Ok(None);
    }
    text.trim()
        .parse()
        .map(Some)
        .map_err(|_| AutoruleError::Validation(format!("Invalid {what} id: {text}")))
}

fn parse_ids(text: &str) -> Result<Vec<i64>, AutoruleError> {
    if is_clear(text) {
        return Ok(Vec::new());
    }
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| AutoruleError::Validation(format!("Invalid tag id: {s}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_changes() {
        let mut prefs = UserPreferences::new(1);
        prefs.default_category_id = Some(4);

        PreferenceChanges {
            auto_fill: Some(true),
            sender: Some("12".to_string()),
            category: Some("none".to_string()),
            tags: Some("3, 4,".to_string()),
            ..PreferenceChanges::default()
        }
        .apply(&mut prefs)
        .unwrap();

        assert!(prefs.auto_fill);
        assert!(!prefs.automation_enabled);
        assert_eq!(prefs.default_sender_id, Some(12));
        assert_eq!(prefs.default_category_id, None);
        assert_eq!(prefs.default_tag_ids, vec![3, 4]);
    }

    #[test]
    fn test_invalid_id() {
        let mut prefs = UserPreferences::new(1);
        let result = PreferenceChanges {
            priority: Some("high".to_string()),
            ..PreferenceChanges::default()
        }
        .apply(&mut prefs);

        assert!(matches!(result, Err(AutoruleError::Validation(_))));
    }
}
