//! Configuration management for autorule.
//!
//! This module handles loading and saving configuration from `~/.autorule/`.

mod paths;
mod settings;

pub use paths::Paths;
pub use settings::{ColorSetting, Config, EngineSettings, GeneralConfig};
