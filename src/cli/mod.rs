//! Command-line interface for autorule.

pub mod args;
pub mod commands;
