//! Command implementations for autorule.
//!
//! This module contains the implementation of all CLI commands.

mod prefs;
mod record;
mod rule;

pub use prefs::{prefs, PreferenceChanges};
pub use record::record;
pub use rule::{build_rule, rule};

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::args::Cli;
use crate::error::AutoruleError;

/// Generate shell completions.
///
/// # Errors
///
/// Returns an error if the generated script is not valid UTF-8.
pub fn completions(shell: Shell) -> Result<String, AutoruleError> {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, "autorule", &mut buf);
    String::from_utf8(buf).map_err(|e| AutoruleError::Parse(format!("UTF-8 error: {e}")))
}
