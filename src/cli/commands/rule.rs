//! Rule command implementation.
//!
//! Handles automation rule management commands.

use std::fs;

use crate::cli::args::{CreateRuleArgs, OutputFormat, RuleCommands};
use crate::error::AutoruleError;
use crate::features::automation::{
    ActionSpec, AutomationEngine, ConditionSpec, EngineConfig, Rule, RuleSet, RuleStorage,
};
use crate::output::{format_notification_pretty, format_rule, format_rules, to_json};

/// Execute rule subcommands.
///
/// # Errors
///
/// Returns an error if the rule store cannot be used or the command fails.
pub fn rule(
    cmd: RuleCommands,
    config: EngineConfig,
    format: OutputFormat,
) -> Result<String, AutoruleError> {
    let engine = AutomationEngine::with_storage(RuleStorage::new()?, config);
    let storage = engine.storage();

    match cmd {
        RuleCommands::List { model } => {
            let rules = match model {
                Some(model) => storage
                    .list()?
                    .into_iter()
                    .filter(|r| r.target_model == Some(model))
                    .collect(),
                None => storage.list()?,
            };
            format_rules(&rules, format)
        },
        RuleCommands::Show { name } => format_rule(&storage.get(&name)?, format),
        RuleCommands::Create(args) => create_rule(storage, args, format),
        RuleCommands::Delete { name, force } => delete_rule(storage, &name, force, format),
        RuleCommands::Toggle {
            name,
            enable,
            disable,
        } => toggle_rule(storage, &name, enable, disable, format),
        RuleCommands::Test { name } => {
            let notification = engine.test_rule(&storage.get(&name)?)?;
            match format {
                OutputFormat::Json => to_json(&notification),
                OutputFormat::Pretty => Ok(format_notification_pretty(&notification)),
            }
        },
        RuleCommands::Import { path } => import_rules(storage, &path, format),
        RuleCommands::Export { path, rules } => export_rules(storage, path.as_deref(), rules, format),
    }
}

/// Build a rule from command-line arguments.
///
/// # Errors
///
/// Returns an error if no action is given.
pub fn build_rule(args: CreateRuleArgs) -> Result<Rule, AutoruleError> {
    let action = if let Some((field, value)) = args.set {
        ActionSpec::set_field(field, value)
    } else if let Some(values) = args.set_fields {
        ActionSpec::set_fields(values)
    } else if let Some(code) = args.action {
        ActionSpec::custom(code)
    } else {
        return Err(AutoruleError::Validation(
            "An action is required: use --set, --set-fields or --action".to_string(),
        ));
    };

    let condition = match (args.condition, args.field) {
        (Some(code), _) => ConditionSpec::custom(code),
        (None, Some(field)) => ConditionSpec::field(field, args.operator, args.value),
        (None, None) => ConditionSpec::Always,
    };

    let mut rule = Rule::new(args.name, args.model, action)
        .with_condition(condition)
        .with_sequence(args.sequence)
        .with_active(!args.inactive);

    if let Some(description) = args.description {
        rule = rule.with_description(description);
    }
    if let Some(user) = args.scope_user {
        rule = rule.with_scope_user(user);
    }

    Ok(rule)
}

fn create_rule(
    storage: &RuleStorage,
    args: CreateRuleArgs,
    format: OutputFormat,
) -> Result<String, AutoruleError> {
    if storage.load(&args.name)?.is_some() {
        return Err(AutoruleError::Validation(format!(
            "Rule already exists: {}",
            args.name
        )));
    }

    let rule = build_rule(args)?;
    storage.save(&rule)?;

    match format {
        OutputFormat::Json => to_json(&rule),
        OutputFormat::Pretty => Ok(format!(
            "Created rule: {}\n\nStored at: {}",
            rule.name,
            storage.rule_path(&rule.name).display()
        )),
    }
}

fn delete_rule(
    storage: &RuleStorage,
    name: &str,
    force: bool,
    format: OutputFormat,
) -> Result<String, AutoruleError> {
    if !force {
        return Err(AutoruleError::Validation(
            "Use --force to delete rule".to_string(),
        ));
    }

    if !storage.delete(name)? {
        return Err(AutoruleError::NotFound(format!("Rule not found: {name}")));
    }

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({ "deleted": name })),
        OutputFormat::Pretty => Ok(format!("Deleted rule: {name}")),
    }
}

fn toggle_rule(
    storage: &RuleStorage,
    name: &str,
    enable: bool,
    disable: bool,
    format: OutputFormat,
) -> Result<String, AutoruleError> {
    let active = if enable {
        true
    } else if disable {
        false
    } else {
        !storage.get(name)?.active
    };

    let rule = storage.set_active(name, active)?;

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({
            "name": rule.name,
            "active": rule.active,
        })),
        OutputFormat::Pretty => Ok(format!(
            "Rule {} is now {}",
            rule.name,
            if rule.active { "active" } else { "inactive" }
        )),
    }
}

fn import_rules(
    storage: &RuleStorage,
    path: &str,
    format: OutputFormat,
) -> Result<String, AutoruleError> {
    let yaml = fs::read_to_string(path)
        .map_err(|e| AutoruleError::Config(format!("Failed to read file: {e}")))?;
    let set = RuleSet::from_yaml(&yaml)?;
    let imported = storage.import(&set)?;

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({ "imported": imported })),
        OutputFormat::Pretty => Ok(format!("Imported {imported} rules")),
    }
}

fn export_rules(
    storage: &RuleStorage,
    path: Option<&str>,
    names: Option<Vec<String>>,
    format: OutputFormat,
) -> Result<String, AutoruleError> {
    let rules: Vec<Rule> = storage
        .list()?
        .into_iter()
        .filter(|r| names.as_ref().map_or(true, |n| n.contains(&r.name)))
        .collect();
    let count = rules.len();
    let yaml = RuleSet::new(rules).to_yaml()?;

    let Some(path) = path else {
        return Ok(yaml);
    };

    fs::write(path, yaml)
        .map_err(|e| AutoruleError::Config(format!("Failed to write file: {e}")))?;

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({
            "exported": count,
            "path": path,
        })),
        OutputFormat::Pretty => Ok(format!("Exported {count} rules to {path}")),
    }
}
