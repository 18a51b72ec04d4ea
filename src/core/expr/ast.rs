//! Expression tree.

use crate::core::FieldValue;
use crate::error::AutoruleError;

/// Binary operators, loosest binding last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `=`, `==`
    Equal,
    /// `!=`, `<>`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
    /// `CONTAINS`
    Contains,
    /// `NOT CONTAINS`
    NotContains,
    /// `AND`
    And,
    /// `OR`
    Or,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Logical negation.
    Not,
}

/// Whitelisted pure functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `lower(text)`
    Lower,
    /// `upper(text)`
    Upper,
    /// `trim(text)`
    Trim,
    /// `len(text | list)`
    Len,
    /// `abs(number)`
    Abs,
    /// `round(number[, digits])`
    Round,
    /// `coalesce(a, b, ...)`
    Coalesce,
    /// `concat(a, b, ...)`
    Concat,
}

impl Function {
    /// Look up a function by name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error for any name outside the whitelist.
    pub fn from_name(name: &str) -> Result<Self, AutoruleError> {
        match name.to_lowercase().as_str() {
            "lower" => Ok(Self::Lower),
            "upper" => Ok(Self::Upper),
            "trim" => Ok(Self::Trim),
            "len" => Ok(Self::Len),
            "abs" => Ok(Self::Abs),
            "round" => Ok(Self::Round),
            "coalesce" => Ok(Self::Coalesce),
            "concat" => Ok(Self::Concat),
            _ => Err(AutoruleError::Expression(format!(
                "Unknown function '{name}'"
            ))),
        }
    }

    /// Function name as written in expressions.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lower => "lower",
            Self::Upper => "upper",
            Self::Trim => "trim",
            Self::Len => "len",
            Self::Abs => "abs",
            Self::Round => "round",
            Self::Coalesce => "coalesce",
            Self::Concat => "concat",
        }
    }

    /// Accepted argument count as `(min, max)`; `None` means unbounded.
    #[must_use]
    pub const fn arity(self) -> (usize, Option<usize>) {
        match self {
            Self::Lower | Self::Upper | Self::Trim | Self::Len | Self::Abs => (1, Some(1)),
            Self::Round => (1, Some(2)),
            Self::Coalesce | Self::Concat => (1, None),
        }
    }
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant value.
    Literal(FieldValue),
    /// Read of a record field.
    Field(String),
    /// `[a, b]` or `(a, b)` list.
    List(Vec<Expr>),
    /// Prefix operator.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Infix operator.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `x IS NULL` / `x IS NOT NULL`.
    IsNull {
        /// Tested expression.
        operand: Box<Expr>,
        /// True for `IS NOT NULL`.
        negated: bool,
    },
    /// Function call.
    Call {
        /// Called function.
        function: Function,
        /// Arguments.
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Collect the names of all fields the expression reads.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_fields(&mut names);
        names
    }

    fn collect_fields<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {},
            Self::Field(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            },
            Self::List(items) | Self::Call { args: items, .. } => {
                for item in items {
                    item.collect_fields(names);
                }
            },
            Self::Unary { operand, .. } | Self::IsNull { operand, .. } => {
                operand.collect_fields(names);
            },
            Self::Binary { left, right, .. } => {
                left.collect_fields(names);
                right.collect_fields(names);
            },
        }
    }
}

/// One `field := expression` statement of a custom action.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Target field.
    pub field: String,
    /// Value expression, evaluated against the record before any write.
    pub value: Expr,
}
