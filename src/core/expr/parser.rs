//! Recursive descent parser for rule expressions.
//!
//! Precedence, loosest first: `OR`, `AND`, `NOT`, comparisons (including
//! `IN`, `CONTAINS`, `IS NULL`), `+ -`, `* /`, unary minus.

use crate::core::FieldValue;
use crate::error::AutoruleError;

use super::ast::{Assignment, BinaryOp, Expr, Function, UnaryOp};
use super::lexer::{tokenize, Token};

/// Words that cannot be used as field names.
const KEYWORDS: [&str; 9] = [
    "and", "or", "not", "in", "is", "null", "true", "false", "contains",
];

/// Prefix accepted in front of field names.
const RECORD_PREFIX: &str = "record.";

/// Parse a boolean or value expression.
///
/// # Errors
///
/// Returns an error if the source is empty or not a single well-formed
/// expression.
pub fn parse_expression(source: &str) -> Result<Expr, AutoruleError> {
    let mut parser = Parser::new(source)?;
    if parser.at_end() {
        return Err(AutoruleError::Expression("Empty expression".to_string()));
    }
    let expr = parser.expression()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse `field := expression` statements separated by `;`.
///
/// # Errors
///
/// Returns an error if the source holds no statement or any statement is
/// malformed.
pub fn parse_assignments(source: &str) -> Result<Vec<Assignment>, AutoruleError> {
    let mut parser = Parser::new(source)?;
    let mut assignments = Vec::new();

    while !parser.at_end() {
        if parser.eat(&Token::Semicolon) {
            continue;
        }
        assignments.push(parser.assignment()?);
        if !parser.at_end() {
            parser.expect(&Token::Semicolon)?;
        }
    }

    if assignments.is_empty() {
        return Err(AutoruleError::Expression(
            "Expected at least one 'field := value' assignment".to_string(),
        ));
    }
    Ok(assignments)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Result<Self, AutoruleError> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), AutoruleError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{expected}'")))
        }
    }

    fn expect_end(&self) -> Result<(), AutoruleError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of expression"))
        }
    }

    fn unexpected(&self, wanted: &str) -> AutoruleError {
        match self.peek() {
            Some(token) => {
                AutoruleError::Expression(format!("Expected {wanted}, found '{token}'"))
            },
            None => AutoruleError::Expression(format!("Expected {wanted}, found end of input")),
        }
    }

    fn assignment(&mut self) -> Result<Assignment, AutoruleError> {
        let field = match self.peek() {
            Some(Token::Ident(name)) => field_name(name)?,
            _ => return Err(self.unexpected("field name")),
        };
        self.pos += 1;
        self.expect(&Token::Assign)?;
        let value = self.expression()?;
        Ok(Assignment { field, value })
    }

    fn expression(&mut self) -> Result<Expr, AutoruleError> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr, AutoruleError> {
        let mut left = self.and()?;
        while self.eat_keyword("or") {
            let right = self.and()?;
            left = binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, AutoruleError> {
        let mut left = self.not()?;
        while self.eat_keyword("and") {
            let right = self.not()?;
            left = binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, AutoruleError> {
        if self.eat_keyword("not") {
            let operand = self.not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, AutoruleError> {
        let left = self.additive()?;

        let op = match self.peek() {
            Some(Token::Eq) => Some(BinaryOp::Equal),
            Some(Token::NotEq) => Some(BinaryOp::NotEqual),
            Some(Token::Lt) => Some(BinaryOp::LessThan),
            Some(Token::Le) => Some(BinaryOp::LessThanOrEqual),
            Some(Token::Gt) => Some(BinaryOp::GreaterThan),
            Some(Token::Ge) => Some(BinaryOp::GreaterThanOrEqual),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let right = self.additive()?;
            return Ok(binary(left, op, right));
        }

        if self.eat_keyword("is") {
            let negated = self.eat_keyword("not");
            if !self.eat_keyword("null") {
                return Err(self.unexpected("NULL"));
            }
            return Ok(Expr::IsNull {
                operand: Box::new(left),
                negated,
            });
        }

        let negated = self.peek().is_some_and(|t| t.is_keyword("not"))
            && self
                .peek_at(1)
                .is_some_and(|t| t.is_keyword("in") || t.is_keyword("contains"));
        if negated {
            self.pos += 1;
        }

        if self.eat_keyword("in") {
            let right = self.additive()?;
            let op = if negated { BinaryOp::NotIn } else { BinaryOp::In };
            return Ok(binary(left, op, right));
        }
        if self.eat_keyword("contains") {
            let right = self.additive()?;
            let op = if negated {
                BinaryOp::NotContains
            } else {
                BinaryOp::Contains
            };
            return Ok(binary(left, op, right));
        }

        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, AutoruleError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = binary(left, op, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, AutoruleError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = binary(left, op, right);
        }
    }

    fn unary(&mut self) -> Result<Expr, AutoruleError> {
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(match operand {
                Expr::Literal(FieldValue::Integer(i)) => {
                    Expr::Literal(FieldValue::Integer(i.wrapping_neg()))
                },
                Expr::Literal(FieldValue::Decimal(d)) => Expr::Literal(FieldValue::Decimal(-d)),
                other => Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(other),
                },
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, AutoruleError> {
        let Some(token) = self.advance() else {
            return Err(self.unexpected("a value"));
        };

        match token {
            Token::Integer(i) => Ok(Expr::Literal(FieldValue::Integer(i))),
            Token::Decimal(d) => Ok(Expr::Literal(FieldValue::Decimal(d))),
            Token::Text(s) => Ok(Expr::Literal(FieldValue::Text(s))),
            Token::LBracket => {
                let items = self.items(&Token::RBracket)?;
                Ok(Expr::List(items))
            },
            Token::LParen => {
                let first = self.expression()?;
                if self.eat(&Token::RParen) {
                    return Ok(first);
                }
                self.expect(&Token::Comma)?;
                let mut items = vec![first];
                items.extend(self.items(&Token::RParen)?);
                Ok(Expr::List(items))
            },
            Token::Ident(name) => self.identifier(&name),
            other => {
                self.pos -= 1;
                Err(self.unexpected(&format!("a value instead of '{other}'")))
            },
        }
    }

    /// Parse comma-separated expressions up to and including `close`.
    fn items(&mut self, close: &Token) -> Result<Vec<Expr>, AutoruleError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(&Token::Comma)?;
        }
    }

    fn identifier(&mut self, name: &str) -> Result<Expr, AutoruleError> {
        match name.to_lowercase().as_str() {
            "true" => return Ok(Expr::Literal(FieldValue::Bool(true))),
            "false" => return Ok(Expr::Literal(FieldValue::Bool(false))),
            "null" => return Ok(Expr::Literal(FieldValue::Null)),
            _ => {},
        }

        if self.eat(&Token::LParen) {
            let function = Function::from_name(name)?;
            let args = self.items(&Token::RParen)?;
            check_arity(function, args.len())?;
            return Ok(Expr::Call { function, args });
        }

        Ok(Expr::Field(field_name(name)?))
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

/// Validate a field reference and strip an optional `record.` prefix.
fn field_name(raw: &str) -> Result<String, AutoruleError> {
    let name = raw
        .get(..RECORD_PREFIX.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(RECORD_PREFIX))
        .map_or(raw, |_| &raw[RECORD_PREFIX.len()..]);

    if name.is_empty() || name.contains('.') {
        return Err(AutoruleError::Expression(format!(
            "Invalid field reference '{raw}'"
        )));
    }
    if KEYWORDS.contains(&name.to_lowercase().as_str()) {
        return Err(AutoruleError::Expression(format!(
            "'{name}' is a keyword, not a field"
        )));
    }
    Ok(name.to_string())
}

fn check_arity(function: Function, count: usize) -> Result<(), AutoruleError> {
    let (min, max) = function.arity();
    let too_many = max.is_some_and(|max| count > max);
    if count < min || too_many {
        let expected = match max {
            Some(max) if max == min => format!("{min}"),
            Some(max) => format!("{min} to {max}"),
            None => format!("at least {min}"),
        };
        return Err(AutoruleError::Expression(format!(
            "{}() takes {expected} argument(s), got {count}",
            function.name()
        )));
    }
    Ok(())
}
