//! Conditional field automation.
//!
//! This module provides the rule engine that mutates records when they are
//! created or edited.
//!
//! Features:
//! - Rule definitions with a condition and an action per target model
//! - Field comparisons and restricted custom expressions
//! - Save-time safety checks for custom code
//! - Execution statistics per rule
//! - Dry-run mode and a blank-record self-test

pub mod action;
pub mod condition;
pub mod engine;
pub mod events;
pub mod rule;
pub mod safety;
pub mod storage;

pub use action::{ActionOutcome, ActionSpec};
pub use condition::{ConditionOperator, ConditionSpec};
pub use engine::{
    format_engine_result, AutomationEngine, EngineConfig, EngineResult, Notification, RuleResult,
    Severity,
};
pub use events::{EngineEvent, EventSink, TracingSink};
pub use rule::Rule;
pub use storage::{RuleSet, RuleStorage};
