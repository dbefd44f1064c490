//! Literal coercion: statement text to typed scalars.

use tabula_types::{parse_numeral, Value};

/// Converts a literal token into a typed scalar.
///
/// A token that is entirely a numeral becomes a number and the exact words
/// `true`/`false` become booleans. Anything else is text, with one layer of
/// matching surrounding quotes removed. Never fails.
pub fn coerce(token: &str) -> Value {
    if let Some(n) = parse_numeral(token) {
        return Value::Number(n);
    }
    match token {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => Value::Text(strip_quotes(token).to_string()),
    }
}

/// Removes one layer of matching `'` or `"` quotes, if present.
pub(crate) fn strip_quotes(token: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = token
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    token
}
