//! Best-effort conversion of rule literals.
//!
//! Rule literals are always stored as text. Before comparing or writing, the
//! text is converted to the kind of the field's current value. Conversion
//! never fails: when the text does not parse, it is handed back unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

use super::traits::FieldValue;

/// Texts accepted as `true` when coercing against a boolean.
const TRUTHY: [&str; 4] = ["true", "1", "yes", "on"];

/// `[a, b]` or `(a, b)` wrapper around a collection literal.
static COLLECTION_WRAPPER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\[(?P<square>.*)\]|\((?P<round>.*)\))\s*$")
        .unwrap_or_else(|e| panic!("Invalid collection regex: {e}"))
});

/// Convert `text` into a value of the same kind as `reference`.
///
/// - boolean reference: `true`, `1`, `yes`, `on` (any case) are true,
///   everything else is false
/// - integer reference: parsed as `i64`, else the text unchanged
/// - decimal reference: parsed as a finite `f64`, else the text unchanged
/// - anything else, including null: the text verbatim
#[must_use]
pub fn coerce(reference: &FieldValue, text: &str) -> FieldValue {
    match reference {
        FieldValue::Bool(_) => {
            let lowered = text.to_lowercase();
            FieldValue::Bool(TRUTHY.contains(&lowered.as_str()))
        },
        FieldValue::Integer(_) => text
            .trim()
            .parse::<i64>()
            .map_or_else(|_| FieldValue::Text(text.to_string()), FieldValue::Integer),
        FieldValue::Decimal(_) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map_or_else(|| FieldValue::Text(text.to_string()), FieldValue::Decimal),
        FieldValue::Null
        | FieldValue::Text(_)
        | FieldValue::List(_)
        | FieldValue::Reference(_) => FieldValue::Text(text.to_string()),
    }
}

/// Split a collection literal and coerce every item.
///
/// Accepted forms are `[a, b]`, `(a, b)` and bare `a, b`. Items are trimmed
/// and may be quoted with `'` or `"`; commas inside a quoted item are kept. For list fields the items are coerced
/// against the list's first element.
#[must_use]
pub fn coerce_collection(reference: &FieldValue, text: &str) -> Vec<FieldValue> {
    let inner = COLLECTION_WRAPPER.captures(text).map_or(text, |caps| {
        caps.name("square")
            .or_else(|| caps.name("round"))
            .map_or(text, |m| m.as_str())
    });

    if inner.trim().is_empty() {
        return Vec::new();
    }

    let element = match reference {
        FieldValue::List(items) => items.first().cloned().unwrap_or_default(),
        other => other.clone(),
    };

    split_items(inner)
        .into_iter()
        .map(|item| coerce(&element, unquote(item.trim())))
        .collect()
}

/// Split on commas that are not inside a quoted item.
fn split_items(inner: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;

    for (i, c) in inner.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {},
            (None, '\'' | '"') if inner[start..i].trim().is_empty() => quote = Some(c),
            (None, ',') => {
                items.push(&inner[start..i]);
                start = i + 1;
            },
            _ => {},
        }
    }
    items.push(&inner[start..]);

    items
}

/// Strip one pair of matching quotes.
fn unquote(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
