//! Storage for automation rules.
//!
//! Persists rules to YAML files in `~/.autorule/rules/`, one file per rule.
//! Rules are validated before they are written.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::rule::Rule;
use crate::config::Paths;
use crate::error::AutoruleError;
use crate::records::TargetModel;

/// Storage for automation rules.
pub struct RuleStorage {
    rules_dir: PathBuf,
}

impl RuleStorage {
    /// Create a new rule storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be accessed.
    pub fn new() -> Result<Self, AutoruleError> {
        let paths = Paths::new()?;
        paths.ensure_dirs()?;
        Ok(Self {
            rules_dir: paths.rules,
        })
    }

    /// Create storage with a custom directory.
    #[must_use]
    pub const fn with_dir(rules_dir: PathBuf) -> Self {
        Self { rules_dir }
    }

    /// Validate and save a rule to disk, replacing any rule with the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is invalid, if its file already holds a
    /// rule with a different name, or if it cannot be written.
    pub fn save(&self, rule: &Rule) -> Result<(), AutoruleError> {
        rule.validate()?;
        self.check_slot(&rule.name)?;

        if !self.rules_dir.exists() {
            fs::create_dir_all(&self.rules_dir).map_err(|e| {
                AutoruleError::Config(format!("Failed to create rules directory: {e}"))
            })?;
        }

        let yaml = serde_yaml::to_string(rule)
            .map_err(|e| AutoruleError::Config(format!("Failed to serialize rule: {e}")))?;

        fs::write(self.rule_path(&rule.name), yaml)
            .map_err(|e| AutoruleError::Config(format!("Failed to write rule file: {e}")))?;

        Ok(())
    }

    /// Load a rule by name.
    ///
    /// A file that holds a rule under another name does not count.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule file exists but cannot be read.
    pub fn load(&self, name: &str) -> Result<Option<Rule>, AutoruleError> {
        let path = self.rule_path(name);

        if !path.exists() {
            return Ok(None);
        }

        let rule = Self::read_rule(&path)?;
        if rule.name != name {
            return Ok(None);
        }

        Ok(Some(rule))
    }

    /// Load a rule by name, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such rule.
    pub fn get(&self, name: &str) -> Result<Rule, AutoruleError> {
        self.load(name)?
            .ok_or_else(|| AutoruleError::NotFound(format!("Rule not found: {name}")))
    }

    /// List all valid rules in execution order.
    ///
    /// Files that cannot be parsed, fail validation or are not named after
    /// the rule they hold are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules directory cannot be read.
    pub fn list(&self) -> Result<Vec<Rule>, AutoruleError> {
        let mut rules = Vec::new();

        if !self.rules_dir.exists() {
            return Ok(rules);
        }

        let entries = fs::read_dir(&self.rules_dir)
            .map_err(|e| AutoruleError::Config(format!("Failed to read rules directory: {e}")))?;

        for entry in entries {
            let entry =
                entry.map_err(|e| AutoruleError::Config(format!("Failed to read entry: {e}")))?;

            let path = entry.path();
            if !path
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
            {
                continue;
            }

            let yaml = fs::read_to_string(&path)
                .map_err(|e| AutoruleError::Config(format!("Failed to read rule: {e}")))?;

            let rule = match serde_yaml::from_str::<Rule>(&yaml) {
                Ok(rule) => rule,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse rule");
                    continue;
                },
            };

            if let Err(e) = rule.validate() {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring invalid rule");
                continue;
            }

            let expected = Self::rule_filename(&rule.name);
            if path.file_name() != Some(OsStr::new(&expected)) {
                tracing::warn!(
                    path = %path.display(),
                    rule = %rule.name,
                    "Ignoring rule stored under another rule's file name"
                );
                continue;
            }

            rules.push(rule);
        }

        rules.sort_by(Rule::execution_order);

        Ok(rules)
    }

    /// Active rules for a model, in execution order.
    ///
    /// # Errors
    ///
    /// Returns an error if rules cannot be listed.
    pub fn for_model(&self, model: TargetModel) -> Result<Vec<Rule>, AutoruleError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|rule| rule.applies_to(model))
            .collect())
    }

    /// Activate or deactivate a rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule does not exist or cannot be saved.
    pub fn set_active(&self, name: &str, active: bool) -> Result<Rule, AutoruleError> {
        let mut rule = self.get(name)?;
        rule.active = active;
        self.save(&rule)?;
        Ok(rule)
    }

    /// Save every rule of a set; nothing is written if any rule is invalid.
    ///
    /// # Errors
    ///
    /// Returns the first validation or write error.
    pub fn import(&self, set: &RuleSet) -> Result<usize, AutoruleError> {
        let mut slots: HashMap<String, &str> = HashMap::new();
        for rule in &set.rules {
            rule.validate().map_err(|e| {
                AutoruleError::Validation(format!("Rule '{}': {e}", rule.name))
            })?;
            self.check_slot(&rule.name)?;
            if let Some(other) = slots.insert(Self::rule_filename(&rule.name), &rule.name) {
                if other != rule.name {
                    return Err(AutoruleError::Validation(format!(
                        "Rules '{other}' and '{}' would share a file",
                        rule.name
                    )));
                }
            }
        }
        for rule in &set.rules {
            self.save(rule)?;
        }
        Ok(set.rules.len())
    }

    /// Delete a rule by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule cannot be deleted.
    pub fn delete(&self, name: &str) -> Result<bool, AutoruleError> {
        if self.load(name)?.is_none() {
            return Ok(false);
        }

        fs::remove_file(self.rule_path(name))
            .map_err(|e| AutoruleError::Config(format!("Failed to delete rule: {e}")))?;

        Ok(true)
    }

    /// Get the path to a rule file.
    #[must_use]
    pub fn rule_path(&self, name: &str) -> PathBuf {
        self.rules_dir.join(Self::rule_filename(name))
    }

    /// Fail if the file for `name` holds a rule with a different name.
    fn check_slot(&self, name: &str) -> Result<(), AutoruleError> {
        let path = self.rule_path(name);
        if !path.exists() {
            return Ok(());
        }
        match Self::read_rule(&path) {
            Ok(existing) if existing.name != name => Err(AutoruleError::Validation(format!(
                "Rule '{name}' would overwrite rule '{}' in {}",
                existing.name,
                path.display()
            ))),
            _ => Ok(()),
        }
    }

    fn read_rule(path: &Path) -> Result<Rule, AutoruleError> {
        let yaml = fs::read_to_string(path)
            .map_err(|e| AutoruleError::Config(format!("Failed to read rule file: {e}")))?;

        serde_yaml::from_str(&yaml)
            .map_err(|e| AutoruleError::Config(format!("Failed to parse rule: {e}")))
    }

    /// Generate a filename for a rule.
    fn rule_filename(name: &str) -> String {
        let safe_name: String = name
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        format!("{safe_name}.yaml")
    }
}

/// Rule set for import and export.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuleSet {
    /// Rules in this set
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Create a rule set.
    #[must_use]
    pub const fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Export to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, AutoruleError> {
        serde_yaml::to_string(self)
            .map_err(|e| AutoruleError::Config(format!("Failed to serialize rules: {e}")))
    }

    /// Import from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_yaml(yaml: &str) -> Result<Self, AutoruleError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| AutoruleError::Config(format!("Failed to parse rules: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::automation::action::ActionSpec;
    use crate::features::automation::condition::ConditionSpec;
    use tempfile::TempDir;

    fn create_test_storage() -> (RuleStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = RuleStorage::with_dir(temp_dir.path().to_path_buf());
        (storage, temp_dir)
    }

    fn rule(name: &str, model: TargetModel) -> Rule {
        Rule::new(name, model, ActionSpec::set_field("name", "x"))
    }

    #[test]
    fn test_save_and_load() {
        let (storage, _temp) = create_test_storage();

        let rule = rule("Test Rule", TargetModel::Partner).with_description("A test rule");
        storage.save(&rule).unwrap();

        let loaded = storage.load("Test Rule").unwrap().unwrap();
        assert_eq!(loaded, rule);
    }

    #[test]
    fn test_save_rejects_unsafe_code() {
        let (storage, _temp) = create_test_storage();

        let rule = rule("Sneaky", TargetModel::Partner)
            .with_condition(ConditionSpec::custom("name = 'x' or __import__"));
        let err = storage.save(&rule).unwrap_err();

        assert!(matches!(err, AutoruleError::UnsafeCode { .. }));
        assert!(storage.load("Sneaky").unwrap().is_none());
    }

    #[test]
    fn test_save_accepts_code_once_denylisted_text_is_removed() {
        let (storage, _temp) = create_test_storage();

        let mut unsafe_rule = rule("Lyon partners", TargetModel::Partner);
        unsafe_rule.action = ActionSpec::custom("city := 'Lyon' import os");
        assert!(matches!(
            storage.save(&unsafe_rule),
            Err(AutoruleError::UnsafeCode { token: "import" })
        ));

        let mut cleaned = unsafe_rule.clone();
        cleaned.action = ActionSpec::custom("city := 'Lyon'");
        storage.save(&cleaned).unwrap();
        assert_eq!(storage.get("Lyon partners").unwrap(), cleaned);
    }

    #[test]
    fn test_list_orders_by_sequence_then_name() {
        let (storage, _temp) = create_test_storage();

        storage.save(&rule("Rule B", TargetModel::Partner).with_sequence(10)).unwrap();
        storage.save(&rule("Rule A", TargetModel::Partner).with_sequence(10)).unwrap();
        storage.save(&rule("Rule C", TargetModel::Partner).with_sequence(5)).unwrap();

        let names: Vec<String> = storage.list().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Rule C", "Rule A", "Rule B"]);
    }

    #[test]
    fn test_list_skips_invalid_files() {
        let (storage, temp) = create_test_storage();

        storage.save(&rule("Good", TargetModel::Invoice)).unwrap();
        std::fs::write(temp.path().join("broken.yaml"), "name: [").unwrap();
        std::fs::write(
            temp.path().join("no_model.yaml"),
            "name: No model\naction:\n  type: set_field\n  field: name\n  value: x\n",
        )
        .unwrap();

        let rules = storage.list().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "Good");
    }

    #[test]
    fn test_for_model_filters_inactive_and_other_models() {
        let (storage, _temp) = create_test_storage();

        storage.save(&rule("Partner", TargetModel::Partner)).unwrap();
        storage.save(&rule("Invoice", TargetModel::Invoice)).unwrap();
        storage
            .save(&rule("Disabled", TargetModel::Partner).with_active(false))
            .unwrap();

        let rules = storage.for_model(TargetModel::Partner).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "Partner");
    }

    #[test]
    fn test_set_active() {
        let (storage, _temp) = create_test_storage();
        storage.save(&rule("Toggle", TargetModel::Partner)).unwrap();

        let rule = storage.set_active("Toggle", false).unwrap();
        assert!(!rule.active);
        assert!(!storage.get("Toggle").unwrap().active);
        assert!(matches!(
            storage.set_active("Missing", true),
            Err(AutoruleError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_rule() {
        let (storage, _temp) = create_test_storage();

        storage.save(&rule("To Delete", TargetModel::Partner)).unwrap();

        assert!(storage.delete("To Delete").unwrap());
        assert!(storage.load("To Delete").unwrap().is_none());
        assert!(!storage.delete("To Delete").unwrap());
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let (storage, _temp) = create_test_storage();

        let mut invalid = rule("Invalid", TargetModel::Partner);
        invalid.target_model = None;
        let set = RuleSet::new(vec![rule("Valid", TargetModel::Partner), invalid]);

        assert!(storage.import(&set).is_err());
        assert!(storage.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_skips_rule_in_foreign_file() {
        let (storage, temp) = create_test_storage();
        let heavy = rule("Heavy", TargetModel::Partner);
        std::fs::write(
            temp.path().join("heavy-copy.yaml"),
            serde_yaml::to_string(&heavy).unwrap(),
        )
        .unwrap();

        assert!(storage.list().unwrap().is_empty());
        assert!(storage.load("Heavy").unwrap().is_none());

        let mut saved = heavy;
        saved.record_execution(chrono::Utc::now());
        storage.save(&saved).unwrap();
        storage.save(&saved).unwrap();

        let rules = storage.list().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].execution_count, 1);
    }

    #[test]
    fn test_save_refuses_to_overwrite_other_rule() {
        let (storage, _temp) = create_test_storage();
        storage.save(&rule("Rule A", TargetModel::Partner)).unwrap();

        let err = storage.save(&rule("Rule/A", TargetModel::Partner)).unwrap_err();
        assert!(matches!(err, AutoruleError::Validation(_)));
        assert!(storage.load("Rule/A").unwrap().is_none());
        assert!(!storage.delete("Rule/A").unwrap());
        assert_eq!(storage.get("Rule A").unwrap().name, "Rule A");
    }

    #[test]
    fn test_import_rejects_names_sharing_a_file() {
        let (storage, _temp) = create_test_storage();
        let set = RuleSet::new(vec![
            rule("Rule A", TargetModel::Partner),
            rule("Rule/A", TargetModel::Partner),
        ]);

        let err = storage.import(&set).unwrap_err();
        assert!(matches!(err, AutoruleError::Validation(_)));
        assert!(storage.list().unwrap().is_empty());
    }

    #[test]
    fn test_rule_set_yaml() {
        let set = RuleSet::new(vec![
            rule("Rule 1", TargetModel::Partner),
            rule("Rule 2", TargetModel::SalesOrder),
        ]);

        let yaml = set.to_yaml().unwrap();
        assert!(yaml.contains("Rule 1"));
        assert!(yaml.contains("sales_order"));

        let parsed = RuleSet::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.rules.len(), 2);
    }
}
