//! Tokenizer for rule expressions.

use std::fmt;

use crate::error::AutoruleError;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer literal.
    Integer(i64),
    /// Decimal literal.
    Decimal(f64),
    /// Quoted text literal, quotes removed.
    Text(String),
    /// Identifier or keyword (`record.` prefixes included).
    Ident(String),
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `:=`
    Assign,
    /// `=` or `==`
    Eq,
    /// `!=` or `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
}

impl Token {
    /// Whether this token is the given keyword, ignoring case.
    #[must_use]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Self::Ident(name) if name.eq_ignore_ascii_case(keyword))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Ident(name) => f.write_str(name),
            Self::Comma => f.write_str(","),
            Self::Semicolon => f.write_str(";"),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
            Self::LBracket => f.write_str("["),
            Self::RBracket => f.write_str("]"),
            Self::Assign => f.write_str(":="),
            Self::Eq => f.write_str("="),
            Self::NotEq => f.write_str("!="),
            Self::Lt => f.write_str("<"),
            Self::Le => f.write_str("<="),
            Self::Gt => f.write_str(">"),
            Self::Ge => f.write_str(">="),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::Slash => f.write_str("/"),
        }
    }
}

/// Split source text into tokens.
///
/// # Errors
///
/// Returns an error on an unterminated string, a malformed number or a
/// character outside the grammar.
pub fn tokenize(source: &str) -> Result<Vec<Token>, AutoruleError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        if c.is_ascii_digit() {
            let (token, next) = read_number(&chars, pos)?;
            tokens.push(token);
            pos = next;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len()
                && (chars[pos].is_alphanumeric() || chars[pos] == '_' || chars[pos] == '.')
            {
                pos += 1;
            }
            tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            continue;
        }

        if c == '\'' || c == '"' {
            let (text, next) = read_string(&chars, pos)?;
            tokens.push(Token::Text(text));
            pos = next;
            continue;
        }

        let next = chars.get(pos + 1).copied();
        let (token, width) = match (c, next) {
            (':', Some('=')) => (Token::Assign, 2),
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) | ('<', Some('>')) => (Token::NotEq, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('=', _) => (Token::Eq, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            (',', _) => (Token::Comma, 1),
            (';', _) => (Token::Semicolon, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            _ => {
                return Err(AutoruleError::Expression(format!(
                    "Unexpected character '{c}' at position {pos}"
                )))
            },
        };
        tokens.push(token);
        pos += width;
    }

    Ok(tokens)
}

fn read_number(chars: &[char], start: usize) -> Result<(Token, usize), AutoruleError> {
    let mut pos = start;
    let mut is_decimal = false;

    while pos < chars.len() {
        let c = chars[pos];
        if c.is_ascii_digit() {
            pos += 1;
        } else if c == '.'
            && !is_decimal
            && chars.get(pos + 1).is_some_and(char::is_ascii_digit)
        {
            is_decimal = true;
            pos += 1;
        } else {
            break;
        }
    }

    let text: String = chars[start..pos].iter().collect();
    let token = if is_decimal {
        text.parse::<f64>().map(Token::Decimal).map_err(|e| {
            AutoruleError::Expression(format!("Invalid number '{text}': {e}"))
        })?
    } else {
        text.parse::<i64>().map(Token::Integer).map_err(|e| {
            AutoruleError::Expression(format!("Invalid number '{text}': {e}"))
        })?
    };

    Ok((token, pos))
}

fn read_string(chars: &[char], start: usize) -> Result<(String, usize), AutoruleError> {
    let quote = chars[start];
    let mut text = String::new();
    let mut pos = start + 1;

    while pos < chars.len() {
        match chars[pos] {
            '\\' if pos + 1 < chars.len() => {
                text.push(chars[pos + 1]);
                pos += 2;
            },
            c if c == quote => return Ok((text, pos + 1)),
            c => {
                text.push(c);
                pos += 1;
            },
        }
    }

    Err(AutoruleError::Expression(format!(
        "Unterminated string starting at position {start}"
    )))
}
