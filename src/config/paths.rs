//! Path resolution for autorule configuration and data files.
//!
//! All autorule data is stored in `~/.autorule/`:
//! - `config.yaml` - Main configuration file
//! - `autorule.db` - SQLite database for records and user preferences
//! - `rules/` - Automation rules (one YAML file per rule)

use std::path::PathBuf;

use crate::error::AutoruleError;

/// Paths to autorule configuration and data directories.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory: `~/.autorule/`
    pub root: PathBuf,
    /// Config file: `~/.autorule/config.yaml`
    pub config_file: PathBuf,
    /// Database file: `~/.autorule/autorule.db`
    pub database: PathBuf,
    /// Rules directory: `~/.autorule/rules/`
    pub rules: PathBuf,
}

impl Paths {
    /// Create paths based on the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, AutoruleError> {
        let home = std::env::var("HOME").map_err(|_| {
            AutoruleError::Config("Could not determine home directory".to_string())
        })?;

        Ok(Self::with_root(PathBuf::from(home).join(".autorule")))
    }

    /// Create paths with a custom root directory (useful for testing).
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.yaml"),
            database: root.join("autorule.db"),
            rules: root.join("rules"),
            root,
        }
    }

    /// Ensure all directories exist, creating them if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dirs(&self) -> Result<(), AutoruleError> {
        for dir in [&self.root, &self.rules] {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    AutoruleError::Config(format!(
                        "Failed to create directory {}: {e}",
                        dir.display()
                    ))
                })?;
            }
        }

        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::with_root(PathBuf::from(".autorule")))
    }
}
