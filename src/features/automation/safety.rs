//! Definition-time gate for custom rule code.
//!
//! Custom code is scanned for denylisted words and then compiled. A rule is
//! only stored when both steps pass.

use crate::core::expr::{parse_assignments, parse_expression, Assignment, Expr};
use crate::error::AutoruleError;

/// Words rejected anywhere in custom code, matched case-insensitively.
pub const DENYLIST: [&str; 6] = ["import", "exec", "eval", "__", "open", "file"];

/// Reject empty code and code containing a denylisted word.
///
/// # Errors
///
/// Returns `Validation` for empty code and `UnsafeCode` naming the first
/// denylisted word found.
pub fn scan(code: &str) -> Result<(), AutoruleError> {
    if code.trim().is_empty() {
        return Err(AutoruleError::Validation(
            "Custom code cannot be empty".to_string(),
        ));
    }

    let lowered = code.to_lowercase();
    match DENYLIST.iter().copied().find(|token| lowered.contains(token)) {
        Some(token) => Err(AutoruleError::UnsafeCode { token }),
        None => Ok(()),
    }
}

/// Scan and compile custom condition code.
///
/// # Errors
///
/// Returns the scan error, or an `Expression` error if the code does not
/// compile.
pub fn compile_condition(code: &str) -> Result<Expr, AutoruleError> {
    scan(code)?;
    parse_expression(code)
}

/// Scan and compile custom action code.
///
/// # Errors
///
/// Returns the scan error, or an `Expression` error if the code does not
/// compile.
pub fn compile_action(code: &str) -> Result<Vec<Assignment>, AutoruleError> {
    scan(code)?;
    parse_assignments(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denylist_is_case_insensitive() {
        let err = scan("state = 'x' OR EVAL").unwrap_err();
        assert!(matches!(err, AutoruleError::UnsafeCode { token: "eval" }));
        assert_eq!(
            err.to_string(),
            "Code contains potentially dangerous keyword: eval"
        );
    }

    #[test]
    fn test_denylist_matches_substrings() {
        // "reopened" contains "open"
        assert!(matches!(
            scan("state = 'reopened'"),
            Err(AutoruleError::UnsafeCode { token: "open" })
        ));
        assert!(matches!(
            scan("record.__class__"),
            Err(AutoruleError::UnsafeCode { token: "__" })
        ));
    }

    #[test]
    fn test_first_listed_token_is_reported() {
        assert!(matches!(
            scan("exec import"),
            Err(AutoruleError::UnsafeCode { token: "import" })
        ));
    }

    #[test]
    fn test_empty_code_rejected() {
        assert!(matches!(scan("   "), Err(AutoruleError::Validation(_))));
    }

    #[test]
    fn test_compile() {
        assert!(compile_condition("weight > 10").is_ok());
        assert!(matches!(
            compile_condition("weight >"),
            Err(AutoruleError::Expression(_))
        ));
        assert!(compile_action("state := 'done'").is_ok());
        assert!(compile_action("state == 'done'").is_err());
    }
}
