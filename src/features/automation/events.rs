//! Structured engine events.
//!
//! Evaluation-time failures are recovered inside the engine and reported
//! here instead of being returned to the caller.

use std::fmt;

/// Something noteworthy that happened while running a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The condition could not be evaluated and was treated as false.
    ConditionFailed {
        /// Rule name.
        rule: String,
        /// Failure description.
        error: String,
    },
    /// The action wrote the listed fields.
    ActionApplied {
        /// Rule name.
        rule: String,
        /// Written field names.
        fields: Vec<String>,
    },
    /// The action had nothing to write.
    ActionSkipped {
        /// Rule name.
        rule: String,
        /// Why nothing was written.
        reason: String,
    },
    /// The action failed; the record was left untouched.
    ActionFailed {
        /// Rule name.
        rule: String,
        /// Failure description.
        error: String,
    },
    /// Updated execution statistics could not be stored.
    StatisticsNotSaved {
        /// Rule name.
        rule: String,
        /// Failure description.
        error: String,
    },
}

impl EngineEvent {
    /// Name of the rule the event is about.
    #[must_use]
    pub fn rule(&self) -> &str {
        match self {
            Self::ConditionFailed { rule, .. }
            | Self::ActionApplied { rule, .. }
            | Self::ActionSkipped { rule, .. }
            | Self::ActionFailed { rule, .. }
            | Self::StatisticsNotSaved { rule, .. } => rule,
        }
    }

    /// Whether the event reports a recovered failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::ConditionFailed { .. } | Self::ActionFailed { .. } | Self::StatisticsNotSaved { .. }
        )
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConditionFailed { rule, error } => {
                write!(f, "Error evaluating condition for rule {rule}: {error}")
            },
            Self::ActionApplied { rule, fields } => {
                write!(f, "Rule {rule} set {}", fields.join(", "))
            },
            Self::ActionSkipped { rule, reason } => write!(f, "Rule {rule} skipped: {reason}"),
            Self::ActionFailed { rule, error } => {
                write!(f, "Error executing action for rule {rule}: {error}")
            },
            Self::StatisticsNotSaved { rule, error } => {
                write!(f, "Failed to save statistics for rule {rule}: {error}")
            },
        }
    }
}

/// Receiver of engine events.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink {
    /// Handle one event.
    fn emit(&self, event: &EngineEvent);
}

/// Default sink: forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &EngineEvent) {
        match event {
            EngineEvent::ConditionFailed { rule, error } => {
                tracing::warn!(rule = %rule, error = %error, "Error evaluating rule condition");
            },
            EngineEvent::ActionFailed { rule, error } => {
                tracing::warn!(rule = %rule, error = %error, "Error executing rule action");
            },
            EngineEvent::StatisticsNotSaved { rule, error } => {
                tracing::warn!(rule = %rule, error = %error, "Failed to save rule statistics");
            },
            EngineEvent::ActionSkipped { rule, reason } => {
                tracing::debug!(rule = %rule, reason = %reason, "Rule action skipped");
            },
            EngineEvent::ActionApplied { rule, fields } => {
                tracing::debug!(rule = %rule, fields = ?fields, "Rule action applied");
            },
        }
    }
}
