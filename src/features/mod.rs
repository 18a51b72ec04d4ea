//! Feature implementations for autorule.
//!
//! This module contains:
//! - The conditional field automation engine
//! - Per-user auto-fill of courier requests
//! - The record lifecycle that ties both together

pub mod autofill;
pub mod automation;
pub mod lifecycle;
