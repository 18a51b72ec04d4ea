//! Error types for autorule.

use thiserror::Error;

/// Errors surfaced by the rule store, the record host and the CLI.
///
/// Evaluation-time problems inside the engine never reach callers as an
/// `Err`; they are reported through the event sink instead.
#[derive(Debug, Error)]
pub enum AutoruleError {
    /// Configuration or filesystem layout problem.
    #[error("Configuration error: {0}")]
    Config(String),

    /// SQLite failure.
    #[error("Database error: {0}")]
    Database(String),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or parse failure of stored data.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A rule, record or preference set could not be found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A rule or record failed validation on save.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Custom rule code contains a denylisted token.
    #[error("Code contains potentially dangerous keyword: {token}")]
    UnsafeCode {
        /// The offending token as listed in the denylist.
        token: &'static str,
    },

    /// The rule has no target model selected.
    #[error("Please select a model first")]
    MissingModel,

    /// Custom code failed to compile or evaluate.
    #[error("Expression error: {0}")]
    Expression(String),

    /// The named field does not exist on the model.
    #[error("Unknown field '{field}' on {model}")]
    UnknownField {
        /// Model display name.
        model: String,
        /// Requested field name.
        field: String,
    },

    /// A value does not fit the kind of the field it is written to.
    #[error("Field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// Expected kind.
        expected: &'static str,
        /// Kind of the rejected value.
        found: &'static str,
    },
}

impl From<serde_json::Error> for AutoruleError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<serde_yaml::Error> for AutoruleError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<rusqlite::Error> for AutoruleError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}
