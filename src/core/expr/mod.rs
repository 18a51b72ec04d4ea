//! Expression language for custom rule conditions and actions.
//!
//! A small, closed grammar: there is no way to reach anything but the
//! fields of the record being evaluated and a fixed set of pure functions.
//!
//! # Syntax
//!
//! ```text
//! condition:  expr
//! action:     field := expr [; field := expr ...]
//! ```
//!
//! ## Operators
//! - `=`, `==`, `!=`, `<>` - Equality
//! - `<`, `>`, `<=`, `>=` - Ordering (numbers, text, references by id)
//! - `IN`, `NOT IN` - List membership
//! - `CONTAINS`, `NOT CONTAINS` - Case-insensitive substring
//! - `IS NULL`, `IS NOT NULL` - Null checks
//! - `AND`, `OR`, `NOT` - Logic, on truthiness
//! - `+`, `-`, `*`, `/` - Arithmetic (`+` also joins text)
//!
//! ## Functions
//! `lower`, `upper`, `trim`, `len`, `abs`, `round`, `coalesce`, `concat`
//!
//! ## Examples
//!
//! ```text
//! weight > 20 AND priority_id IS NULL
//! record.state IN ('draft', 'sent')
//! lower(name) CONTAINS 'express' OR package_count >= 10
//! package_count := package_count + 1; notes := concat('Bulk: ', name)
//! ```

mod ast;
mod eval;
mod lexer;
mod parser;

pub use ast::{Assignment, BinaryOp, Expr, Function, UnaryOp};
pub use eval::evaluate_assignments;
pub use parser::{parse_assignments, parse_expression};
