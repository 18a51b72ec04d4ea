//! Automation engine for running rules against records.
//!
//! The engine picks the applicable rules for a record's model, then for
//! each rule in execution order evaluates the condition and, when it holds,
//! executes the action. One rule finishes completely before the next starts.

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use super::action::{self, ActionOutcome};
use super::condition;
use super::events::{EngineEvent, EventSink, TracingSink};
use super::rule::Rule;
use super::storage::RuleStorage;
use crate::config::EngineSettings;
use crate::core::Record;
use crate::error::AutoruleError;
use crate::records::{ModelRecord, TargetModel};

/// Configuration for the automation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Dry run mode (evaluate conditions, don't execute actions)
    pub dry_run: bool,
    /// Whether updated statistics are written back to the rule store
    pub persist_statistics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            persist_statistics: true,
        }
    }
}

impl From<&EngineSettings> for EngineConfig {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            dry_run: settings.dry_run,
            persist_statistics: settings.persist_statistics,
        }
    }
}

/// Result of running the engine on one record.
#[derive(Debug, Serialize)]
pub struct EngineResult {
    /// Model of the record
    pub model: TargetModel,
    /// Record id, if stored
    pub record_id: Option<i64>,
    /// Whether actions were suppressed
    pub dry_run: bool,
    /// Rules evaluated
    pub rules_evaluated: usize,
    /// Rules whose condition held
    pub rules_matched: usize,
    /// Individual rule results
    pub rule_results: Vec<RuleResult>,
}

impl EngineResult {
    /// Create an empty result.
    #[must_use]
    pub const fn empty(model: TargetModel, record_id: Option<i64>, dry_run: bool) -> Self {
        Self {
            model,
            record_id,
            dry_run,
            rules_evaluated: 0,
            rules_matched: 0,
            rule_results: Vec::new(),
        }
    }

    /// Number of actions that wrote to the record.
    #[must_use]
    pub fn actions_applied(&self) -> usize {
        self.rule_results
            .iter()
            .filter(|r| r.outcome.as_ref().is_some_and(ActionOutcome::is_applied))
            .count()
    }

    /// Number of actions that failed.
    #[must_use]
    pub fn actions_failed(&self) -> usize {
        self.rule_results
            .iter()
            .filter(|r| matches!(r.outcome, Some(ActionOutcome::Rejected(_))))
            .count()
    }
}

/// Result of running a single rule.
#[derive(Debug, Serialize)]
pub struct RuleResult {
    /// Rule name
    pub rule_name: String,
    /// Rule sequence
    pub sequence: i32,
    /// Whether the condition held
    pub matched: bool,
    /// Action outcome, `None` when not executed
    pub outcome: Option<ActionOutcome>,
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Positive result.
    Success,
    /// Neutral information.
    Info,
}

/// User-facing message returned by the rule self-test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Title
    pub title: String,
    /// Message body
    pub message: String,
    /// Severity
    pub severity: Severity,
}

/// The automation engine.
pub struct AutomationEngine {
    storage: RuleStorage,
    config: EngineConfig,
    sink: Box<dyn EventSink>,
}

impl AutomationEngine {
    /// Create a new automation engine using the default rule store.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be initialized.
    pub fn new() -> Result<Self, AutoruleError> {
        Ok(Self::with_storage(RuleStorage::new()?, EngineConfig::default()))
    }

    /// Create engine with a custom store and config.
    #[must_use]
    pub fn with_storage(storage: RuleStorage, config: EngineConfig) -> Self {
        Self {
            storage,
            config,
            sink: Box::new(TracingSink),
        }
    }

    /// Replace the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Get the rule store.
    #[must_use]
    pub const fn storage(&self) -> &RuleStorage {
        &self.storage
    }

    /// Get the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Active rules for a model, in execution order.
    ///
    /// # Errors
    ///
    /// Returns an error if rules cannot be loaded.
    pub fn applicable_rules(&self, model: TargetModel) -> Result<Vec<Rule>, AutoruleError> {
        self.storage.for_model(model)
    }

    /// Run every applicable rule against a record.
    ///
    /// User scoping is not applied; see [`AutomationEngine::run_for_owner`].
    ///
    /// # Errors
    ///
    /// Returns an error only if rules cannot be loaded. Evaluation and
    /// action failures are reported to the event sink.
    pub fn run<R: Record + ?Sized>(&self, record: &mut R) -> Result<EngineResult, AutoruleError> {
        let rules = self.applicable_rules(record.model())?;
        Ok(self.run_rules(rules, record))
    }

    /// Run the applicable rules meant for `owner` against a record.
    ///
    /// Rules without a scope user always take part.
    ///
    /// # Errors
    ///
    /// Returns an error only if rules cannot be loaded.
    pub fn run_for_owner<R: Record + ?Sized>(
        &self,
        record: &mut R,
        owner: Option<i64>,
    ) -> Result<EngineResult, AutoruleError> {
        let rules = self
            .applicable_rules(record.model())?
            .into_iter()
            .filter(|rule| rule.applies_to_owner(owner))
            .collect();
        Ok(self.run_rules(rules, record))
    }

    fn run_rules<R: Record + ?Sized>(&self, rules: Vec<Rule>, record: &mut R) -> EngineResult {
        let mut result = EngineResult::empty(record.model(), record.id(), self.config.dry_run);

        for mut rule in rules {
            result.rules_evaluated += 1;

            let matched = condition::evaluate(&rule, &*record, self.sink.as_ref());
            let mut rule_result = RuleResult {
                rule_name: rule.name.clone(),
                sequence: rule.sequence,
                matched,
                outcome: None,
            };

            if matched {
                result.rules_matched += 1;

                if !self.config.dry_run {
                    let outcome = action::execute(&mut rule, record, self.sink.as_ref(), Utc::now());
                    rule_result.outcome = Some(outcome);
                    self.persist_statistics(&rule);
                }
            }

            result.rule_results.push(rule_result);
        }

        result
    }

    fn persist_statistics(&self, rule: &Rule) {
        if !self.config.persist_statistics {
            return;
        }
        if let Err(e) = self.storage.save(rule) {
            self.sink.emit(&EngineEvent::StatisticsNotSaved {
                rule: rule.name.clone(),
                error: e.to_string(),
            });
        }
    }

    /// Check a rule's condition against a blank record of its model.
    ///
    /// Nothing is stored and the action never runs.
    ///
    /// # Errors
    ///
    /// Returns `MissingModel` if the rule has no target model.
    pub fn test_rule(&self, rule: &Rule) -> Result<Notification, AutoruleError> {
        let model = rule.target_model.ok_or(AutoruleError::MissingModel)?;
        let record = ModelRecord::blank(model);
        let met = condition::evaluate(rule, &record, self.sink.as_ref());

        Ok(Notification {
            title: "Rule Test".to_string(),
            message: format!("Conditions met: {met}"),
            severity: if met { Severity::Success } else { Severity::Info },
        })
    }
}

/// Format engine result for display.
#[must_use]
pub fn format_engine_result(result: &EngineResult) -> String {
    let mut lines = Vec::new();

    let mode = if result.dry_run { " (dry run)" } else { "" };
    lines.push(format!(
        "Automation run complete{mode}: {}/{} rules matched",
        result.rules_matched, result.rules_evaluated
    ));
    lines.push("─".repeat(50));

    if result.rules_matched == 0 {
        lines.push("  No rules matched".dimmed().to_string());
        return lines.join("\n");
    }

    for rule_result in result.rule_results.iter().filter(|r| r.matched) {
        let status = match &rule_result.outcome {
            Some(ActionOutcome::Applied(_)) => "✓".green(),
            Some(ActionOutcome::Skipped(_)) | None => "○".yellow(),
            Some(ActionOutcome::Rejected(_)) => "✗".red(),
        };

        lines.push(format!(
            "{} {} {}",
            status,
            rule_result.rule_name,
            format!("[{}]", rule_result.sequence).dimmed()
        ));

        let detail = rule_result
            .outcome
            .as_ref()
            .map_or_else(|| "not executed".to_string(), ToString::to_string);
        lines.push(format!("    {detail}"));
    }

    lines.push(String::new());
    lines.push(format!(
        "Summary: {} actions applied, {} failed",
        result.actions_applied(),
        result.actions_failed()
    ));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldMap, FieldValue};
    use crate::features::automation::action::ActionSpec;
    use crate::features::automation::condition::{ConditionOperator, ConditionSpec};
    use crate::features::automation::events::MockEventSink;
    use tempfile::TempDir;

    fn engine(config: EngineConfig) -> (AutomationEngine, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = RuleStorage::with_dir(temp_dir.path().to_path_buf());
        (AutomationEngine::with_storage(storage, config), temp_dir)
    }

    fn courier(weight: f64, user: i64) -> ModelRecord {
        let mut values = FieldMap::new();
        values.insert("name".to_string(), FieldValue::from("CR/0100"));
        values.insert("weight".to_string(), FieldValue::Decimal(weight));
        values.insert("user_id".to_string(), FieldValue::Integer(user));
        ModelRecord::with_values(TargetModel::CourierRequest, values).unwrap()
    }

    fn heavy_rule() -> Rule {
        Rule::new(
            "Heavy",
            TargetModel::CourierRequest,
            ActionSpec::set_field("notes", "heavy parcel"),
        )
        .with_condition(ConditionSpec::field(
            "weight",
            ConditionOperator::GreaterThan,
            "20",
        ))
    }

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert!(!config.dry_run);
        assert!(config.persist_statistics);
    }

    #[test]
    fn test_run_applies_matching_rule_and_persists_statistics() {
        let (engine, _temp) = engine(EngineConfig::default());
        engine.storage().save(&heavy_rule()).unwrap();

        let mut record = courier(25.0, 1);
        let result = engine.run(&mut record).unwrap();

        assert_eq!(result.rules_evaluated, 1);
        assert_eq!(result.rules_matched, 1);
        assert_eq!(result.actions_applied(), 1);
        assert_eq!(record.get("notes"), Some(FieldValue::from("heavy parcel")));

        let stored = engine.storage().get("Heavy").unwrap();
        assert_eq!(stored.execution_count, 1);
        assert!(stored.last_execution.is_some());
    }

    #[test]
    fn test_repeated_runs_execute_each_rule_once() {
        let (engine, temp) = engine(EngineConfig::default());
        engine.storage().save(&heavy_rule()).unwrap();
        std::fs::write(
            temp.path().join("heavy.yaml"),
            serde_yaml::to_string(&heavy_rule()).unwrap(),
        )
        .unwrap();

        for _ in 0..2 {
            let result = engine.run(&mut courier(25.0, 1)).unwrap();
            assert_eq!(result.rules_evaluated, 1);
        }

        let rules = engine.storage().list().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].execution_count, 2);
    }

    #[test]
    fn test_unmatched_rule_keeps_statistics() {
        let (engine, _temp) = engine(EngineConfig::default());
        engine.storage().save(&heavy_rule()).unwrap();

        let mut record = courier(5.0, 1);
        let result = engine.run(&mut record).unwrap();

        assert_eq!(result.rules_matched, 0);
        assert_eq!(engine.storage().get("Heavy").unwrap().execution_count, 0);
    }

    #[test]
    fn test_rules_run_in_sequence_and_see_earlier_writes() {
        let (engine, _temp) = engine(EngineConfig::default());

        let first = Rule::new(
            "Z first",
            TargetModel::CourierRequest,
            ActionSpec::set_field("state", "flagged"),
        )
        .with_sequence(1);
        let second = Rule::new(
            "A second",
            TargetModel::CourierRequest,
            ActionSpec::set_field("notes", "after flag"),
        )
        .with_sequence(2)
        .with_condition(ConditionSpec::field("state", ConditionOperator::Equals, "flagged"));

        engine.storage().save(&second).unwrap();
        engine.storage().save(&first).unwrap();

        let mut record = courier(1.0, 1);
        let result = engine.run(&mut record).unwrap();

        let names: Vec<&str> = result.rule_results.iter().map(|r| r.rule_name.as_str()).collect();
        assert_eq!(names, vec!["Z first", "A second"]);
        assert_eq!(record.get("notes"), Some(FieldValue::from("after flag")));
    }

    #[test]
    fn test_inactive_and_other_model_rules_ignored() {
        let (engine, _temp) = engine(EngineConfig::default());
        engine.storage().save(&heavy_rule().with_active(false)).unwrap();
        engine
            .storage()
            .save(&Rule::new(
                "Partner only",
                TargetModel::Partner,
                ActionSpec::set_field("city", "Paris"),
            ))
            .unwrap();

        let mut record = courier(50.0, 1);
        let result = engine.run(&mut record).unwrap();

        assert_eq!(result.rules_evaluated, 0);
    }

    #[test]
    fn test_run_for_owner_filters_scoped_rules() {
        let (engine, _temp) = engine(EngineConfig::default());
        engine.storage().save(&heavy_rule().with_scope_user(2)).unwrap();

        let mut record = courier(50.0, 1);
        let result = engine.run_for_owner(&mut record, Some(1)).unwrap();
        assert_eq!(result.rules_evaluated, 0);

        let result = engine.run_for_owner(&mut record, Some(2)).unwrap();
        assert_eq!(result.rules_matched, 1);

        // The engine itself does not look at scope users.
        let result = engine.run(&mut courier(50.0, 1)).unwrap();
        assert_eq!(result.rules_matched, 1);
    }

    #[test]
    fn test_dry_run_leaves_record_and_statistics() {
        let (engine, _temp) = engine(EngineConfig {
            dry_run: true,
            persist_statistics: true,
        });
        engine.storage().save(&heavy_rule()).unwrap();

        let mut record = courier(50.0, 1);
        let before = record.clone();
        let result = engine.run(&mut record).unwrap();

        assert_eq!(result.rules_matched, 1);
        assert!(result.rule_results[0].outcome.is_none());
        assert_eq!(record, before);
        assert_eq!(engine.storage().get("Heavy").unwrap().execution_count, 0);
    }

    #[test]
    fn test_failures_go_to_sink_and_do_not_stop_the_run() {
        let temp_dir = TempDir::new().unwrap();
        let storage = RuleStorage::with_dir(temp_dir.path().to_path_buf());

        let broken = Rule::new(
            "Broken",
            TargetModel::CourierRequest,
            ActionSpec::set_fields("{not json"),
        )
        .with_sequence(1);
        storage.save(&broken).unwrap();
        storage.save(&heavy_rule().with_sequence(2)).unwrap();

        let mut sink = MockEventSink::new();
        sink.expect_emit()
            .withf(|event| matches!(event, EngineEvent::ActionFailed { rule, .. } if rule == "Broken"))
            .times(1)
            .return_const(());
        sink.expect_emit()
            .withf(|event| matches!(event, EngineEvent::ActionApplied { rule, .. } if rule == "Heavy"))
            .times(1)
            .return_const(());

        let engine = AutomationEngine::with_storage(storage, EngineConfig::default())
            .with_sink(Box::new(sink));

        let mut record = courier(50.0, 1);
        let result = engine.run(&mut record).unwrap();

        assert_eq!(result.actions_failed(), 1);
        assert_eq!(result.actions_applied(), 1);
        assert_eq!(engine.storage().get("Broken").unwrap().execution_count, 1);
    }

    #[test]
    fn test_rule_self_test() {
        let (engine, _temp) = engine(EngineConfig::default());

        let always = Rule::new(
            "Always",
            TargetModel::Invoice,
            ActionSpec::set_field("state", "posted"),
        );
        let notification = engine.test_rule(&always).unwrap();
        assert_eq!(notification.title, "Rule Test");
        assert_eq!(notification.message, "Conditions met: true");
        assert_eq!(notification.severity, Severity::Success);

        // A blank invoice has no amount yet.
        let amount = always.clone().with_condition(ConditionSpec::field(
            "amount_total",
            ConditionOperator::GreaterThan,
            "100",
        ));
        let notification = engine.test_rule(&amount).unwrap();
        assert_eq!(notification.message, "Conditions met: false");
        assert_eq!(notification.severity, Severity::Info);

        // The action never ran and nothing was stored.
        assert!(engine.storage().list().unwrap().is_empty());
    }

    #[test]
    fn test_self_test_requires_model() {
        let (engine, _temp) = engine(EngineConfig::default());
        let mut rule = heavy_rule();
        rule.target_model = None;

        assert!(matches!(
            engine.test_rule(&rule),
            Err(AutoruleError::MissingModel)
        ));
    }

    #[test]
    fn test_format_engine_result() {
        let (engine, _temp) = engine(EngineConfig::default());
        engine.storage().save(&heavy_rule()).unwrap();

        let result = engine.run(&mut courier(50.0, 1)).unwrap();
        let text = format_engine_result(&result);

        assert!(text.contains("1/1 rules matched"));
        assert!(text.contains("Heavy"));
        assert!(text.contains("1 actions applied"));
    }
}
