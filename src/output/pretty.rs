use colored::Colorize;

use crate::core::{FieldMap, FieldValue};
use crate::features::autofill::UserPreferences;
use crate::features::automation::{format_engine_result, Notification, Rule, Severity};
use crate::features::lifecycle::SavedRecord;
use crate::records::ModelRecord;

/// Format a list of rules as pretty output
pub fn format_rules_pretty(rules: &[Rule]) -> String {
    if rules.is_empty() {
        return "Rules (0)\n  No rules\n\nCreate one with: autorule rule create <name> --model <model>"
            .to_string();
    }

    let mut output = format!("Rules ({})\n", rules.len());
    output.push_str(&"─".repeat(60));
    output.push('\n');

    for rule in rules {
        let status = if rule.active { "✓".green() } else { "○".dimmed() };
        let model = rule
            .target_model
            .map_or_else(|| "no model".to_string(), |m| m.display_name().to_string());

        output.push_str(&format!(
            "{} {}  {}  {}\n",
            status,
            rule.name.bold(),
            format!("[{}]", rule.sequence).dimmed(),
            model.cyan()
        ));
        output.push_str(&format!(
            "    when {} → {}\n",
            rule.condition, rule.action
        ));

        if rule.execution_count > 0 {
            let last = rule
                .last_execution
                .map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
            output.push_str(&format!(
                "    {}\n",
                format!("Runs: {} | Last: {last}", rule.execution_count).dimmed()
            ));
        }
    }

    output
}

/// Format a single rule as pretty output
pub fn format_rule_pretty(rule: &Rule) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Rule: {}", rule.name.bold()));
    lines.push("═".repeat(50));

    if let Some(desc) = &rule.description {
        lines.push(format!("Description: {desc}"));
    }
    lines.push(format!(
        "Status: {}",
        if rule.active { "Active" } else { "Inactive" }
    ));
    lines.push(format!(
        "Model: {}",
        rule.target_model
            .map_or("none", |m| m.display_name())
    ));
    lines.push(format!("Sequence: {}", rule.sequence));
    if let Some(user) = rule.scope_user {
        lines.push(format!("User: {user}"));
    }
    lines.push(String::new());

    lines.push("Condition".to_string());
    lines.push("─".repeat(40));
    lines.push(format!("  {}", rule.condition));
    lines.push(String::new());

    lines.push("Action".to_string());
    lines.push("─".repeat(40));
    lines.push(format!("  {}", rule.action));
    lines.push(String::new());

    lines.push("Statistics".to_string());
    lines.push("─".repeat(40));
    lines.push(format!("  Execution count: {}", rule.execution_count));
    if let Some(last) = rule.last_execution {
        lines.push(format!("  Last execution: {}", last.format("%Y-%m-%d %H:%M")));
    }

    lines.join("\n")
}

/// Format a list of records as pretty output
pub fn format_records_pretty(records: &[ModelRecord]) -> String {
    if records.is_empty() {
        return "Records (0)\n  No records".to_string();
    }

    let mut output = format!("Records ({})\n", records.len());
    output.push_str(&"─".repeat(60));
    output.push('\n');

    for record in records {
        let id = record.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        output.push_str(&format!(
            "{:>5}  {}  {}\n",
            id.dimmed(),
            record.display_name().bold(),
            record.model.display_name().cyan()
        ));
    }

    output
}

/// Format a single record as pretty output
pub fn format_record_pretty(record: &ModelRecord) -> String {
    let mut output = format!(
        "{} {}\n",
        record.display_name().bold(),
        format!("({})", record.model.display_name()).dimmed()
    );

    if let Some(id) = record.id {
        output.push_str(&format!("  {}: {}\n", "ID".dimmed(), id));
    }

    for spec in record.schema() {
        let value = record.values().get(spec.name).cloned().unwrap_or_default();
        if !value.is_truthy() {
            continue;
        }
        output.push_str(&format!("  {}: {}\n", spec.label.dimmed(), value_text(&value)));
    }

    if let Some(updated) = &record.updated_at {
        output.push_str(&format!(
            "  {}: {}\n",
            "Updated".dimmed(),
            updated.format("%Y-%m-%d %H:%M")
        ));
    }

    output
}

/// Format a created or updated record with the automation that ran on it
pub fn format_saved_pretty(saved: &SavedRecord) -> String {
    let mut output = format_record_pretty(&saved.record);

    if !saved.auto_filled.is_empty() {
        output.push_str(&format!(
            "\n{} {}\n",
            "Auto-filled:".yellow(),
            saved.auto_filled.join(", ")
        ));
    }

    if let Some(result) = saved.engine.as_ref().filter(|r| r.rules_evaluated > 0) {
        output.push('\n');
        output.push_str(&format_engine_result(result));
        output.push('\n');
    }

    output
}

/// Format default values as pretty output
pub fn format_defaults_pretty(defaults: &FieldMap) -> String {
    if defaults.is_empty() {
        return "Defaults (0)\n  No defaults".to_string();
    }

    let mut output = format!("Defaults ({})\n", defaults.len());
    output.push_str(&"─".repeat(40));
    output.push('\n');

    for (name, value) in defaults {
        output.push_str(&format!("  {}: {}\n", name.dimmed(), value_text(value)));
    }

    output
}

/// Format a user's preferences as pretty output
pub fn format_preferences_pretty(prefs: &UserPreferences) -> String {
    let on_off = |flag: bool| if flag { "on".green() } else { "off".dimmed() };
    let id = |id: Option<i64>| id.map_or_else(|| "-".to_string(), |id| id.to_string());

    let mut lines = Vec::new();
    lines.push(format!("Preferences for user {}", prefs.user_id.to_string().bold()));
    lines.push("─".repeat(40));
    lines.push(format!("  Auto fill:        {}", on_off(prefs.auto_fill)));
    lines.push(format!("  Automation:       {}", on_off(prefs.automation_enabled)));
    lines.push(format!("  Sender:           {}", id(prefs.default_sender_id)));
    lines.push(format!("  Courier type:     {}", id(prefs.default_courier_type_id)));
    lines.push(format!("  Category:         {}", id(prefs.default_category_id)));
    lines.push(format!("  Priority:         {}", id(prefs.default_priority_id)));

    let tags = if prefs.default_tag_ids.is_empty() {
        "-".to_string()
    } else {
        prefs
            .default_tag_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    lines.push(format!("  Tags:             {tags}"));

    if !prefs.is_active() {
        lines.push(String::new());
        lines.push(
            "Auto-fill is inactive (needs both auto fill and automation)"
                .dimmed()
                .to_string(),
        );
    }

    lines.join("\n")
}

/// Format a notification as pretty output
pub fn format_notification_pretty(notification: &Notification) -> String {
    let icon = match notification.severity {
        Severity::Success => "✓".green(),
        Severity::Info => "ℹ".blue(),
    };
    format!(
        "{} {}\n  {}",
        icon,
        notification.title.bold(),
        notification.message
    )
}

fn value_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Reference(r) => match &r.name {
            Some(name) => format!("{name} (#{})", r.id),
            None => format!("#{}", r.id),
        },
        FieldValue::List(items) => items
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Reference;
    use crate::features::automation::ActionSpec;
    use crate::records::TargetModel;

    fn make_rule(name: &str) -> Rule {
        Rule::new(name, TargetModel::Invoice, ActionSpec::set_field("state", "posted"))
    }

    #[test]
    fn test_format_rules_pretty_empty() {
        let result = format_rules_pretty(&[]);
        assert!(result.contains("Rules (0)"));
        assert!(result.contains("No rules"));
    }

    #[test]
    fn test_format_rules_pretty_lists_each_rule() {
        let mut used = make_rule("Post invoices");
        used.execution_count = 4;
        let result = format_rules_pretty(&[used, make_rule("Other").with_active(false)]);

        assert!(result.contains("Rules (2)"));
        assert!(result.contains("Post invoices"));
        assert!(result.contains("Invoice"));
        assert!(result.contains("set state = posted"));
        assert!(result.contains("Runs: 4"));
    }

    #[test]
    fn test_format_rule_pretty() {
        let rule = make_rule("Post invoices").with_description("Auto post").with_scope_user(3);
        let result = format_rule_pretty(&rule);

        assert!(result.contains("Description: Auto post"));
        assert!(result.contains("Status: Active"));
        assert!(result.contains("User: 3"));
        assert!(result.contains("always"));
        assert!(result.contains("Execution count: 0"));
    }

    #[test]
    fn test_format_record_pretty_skips_blank_fields() {
        let mut values = FieldMap::new();
        values.insert("name".to_string(), FieldValue::from("Acme"));
        values.insert(
            "user_id".to_string(),
            FieldValue::Reference(Reference::named(2, "Marc")),
        );
        let record = ModelRecord::with_values(TargetModel::Partner, values).unwrap();

        let result = format_record_pretty(&record);

        assert!(result.contains("Acme"));
        assert!(result.contains("Marc (#2)"));
        assert!(!result.contains("City"));
    }

    #[test]
    fn test_format_records_pretty_empty() {
        assert!(format_records_pretty(&[]).contains("No records"));
    }

    #[test]
    fn test_format_preferences_pretty() {
        let prefs = UserPreferences {
            auto_fill: true,
            default_tag_ids: vec![1, 2],
            ..UserPreferences::new(5)
        };
        let result = format_preferences_pretty(&prefs);

        assert!(result.contains("Tags:             1, 2"));
        assert!(result.contains("inactive"));
    }

    #[test]
    fn test_format_notification_pretty() {
        let result = format_notification_pretty(&Notification {
            title: "Rule Test".to_string(),
            message: "Conditions met: true".to_string(),
            severity: Severity::Success,
        });
        assert!(result.contains("Rule Test"));
        assert!(result.contains("Conditions met: true"));
    }
}
