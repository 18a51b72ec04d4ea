//! Automation rule definitions.
//!
//! A rule pairs a condition with an action for one target model, and keeps
//! its own execution statistics.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::ActionSpec;
use super::condition::ConditionSpec;
use super::safety;
use crate::error::AutoruleError;
use crate::records::TargetModel;

/// Default execution order.
pub const DEFAULT_SEQUENCE: i32 = 10;

/// An automation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule name
    pub name: String,
    /// Rule description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Inactive rules are never evaluated
    #[serde(default = "default_active")]
    pub active: bool,
    /// Execution order (lower runs first, ties by name)
    #[serde(default = "default_sequence")]
    pub sequence: i32,
    /// User this rule is meant for (empty for all users)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_user: Option<i64>,
    /// Model this rule applies to
    #[serde(default)]
    pub target_model: Option<TargetModel>,
    /// When the rule applies
    #[serde(default)]
    pub condition: ConditionSpec,
    /// What the rule does
    pub action: ActionSpec,
    /// Number of times the action ran
    #[serde(default)]
    pub execution_count: u64,
    /// Last time the action ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<DateTime<Utc>>,
}

const fn default_active() -> bool {
    true
}

const fn default_sequence() -> i32 {
    DEFAULT_SEQUENCE
}

impl Rule {
    /// Create a new active rule that always applies.
    #[must_use]
    pub fn new(name: impl Into<String>, model: TargetModel, action: ActionSpec) -> Self {
        Self {
            name: name.into(),
            description: None,
            active: true,
            sequence: DEFAULT_SEQUENCE,
            scope_user: None,
            target_model: Some(model),
            condition: ConditionSpec::Always,
            action,
            execution_count: 0,
            last_execution: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the condition.
    #[must_use]
    pub fn with_condition(mut self, condition: ConditionSpec) -> Self {
        self.condition = condition;
        self
    }

    /// Set the execution order.
    #[must_use]
    pub fn with_sequence(mut self, sequence: i32) -> Self {
        self.sequence = sequence;
        self
    }

    /// Restrict the rule to one user.
    #[must_use]
    pub fn with_scope_user(mut self, user: i64) -> Self {
        self.scope_user = Some(user);
        self
    }

    /// Set whether the rule is active.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Check the rule can be stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, no model is selected, or
    /// custom code is empty, unsafe or does not compile.
    pub fn validate(&self) -> Result<(), AutoruleError> {
        if self.name.trim().is_empty() {
            return Err(AutoruleError::Validation(
                "Rule name cannot be empty".to_string(),
            ));
        }
        if self.target_model.is_none() {
            return Err(AutoruleError::MissingModel);
        }
        if let ConditionSpec::Custom { code } = &self.condition {
            safety::compile_condition(code)?;
        }
        if let ActionSpec::Custom { code } = &self.action {
            safety::compile_action(code)?;
        }
        Ok(())
    }

    /// Whether the rule is active and targets `model`.
    #[must_use]
    pub fn applies_to(&self, model: TargetModel) -> bool {
        self.active && self.target_model == Some(model)
    }

    /// Whether the rule is meant for records owned by `owner`.
    ///
    /// Unscoped rules are meant for everyone.
    #[must_use]
    pub fn applies_to_owner(&self, owner: Option<i64>) -> bool {
        self.scope_user.map_or(true, |user| owner == Some(user))
    }

    /// Count one execution of the action.
    pub fn record_execution(&mut self, now: DateTime<Utc>) {
        self.execution_count = self.execution_count.saturating_add(1);
        self.last_execution = Some(now);
    }

    /// Execution order: sequence, then name.
    #[must_use]
    pub fn execution_order(&self, other: &Self) -> Ordering {
        self.sequence
            .cmp(&other.sequence)
            .then_with(|| self.name.cmp(&other.name))
    }
}
