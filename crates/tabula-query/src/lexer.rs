//! Tokenization on top of the `sqlparser` tokenizer.
//!
//! Keywords are recognized by spelling (case-insensitive, unquoted words
//! only) rather than through the dialect's keyword table, so a column
//! called `sum` or `count` stays an ordinary identifier.

use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Location, Token, TokenWithLocation, Tokenizer, Word};
use tabula_types::Value;

use crate::coerce::coerce;
use crate::error::{QueryError, Result};

/// Tokenizes statement text, dropping whitespace and comments.
pub(crate) fn tokenize(sql: &str) -> Result<Vec<Token>> {
    let tokens = raw_tokens(sql)?;
    Ok(tokens
        .into_iter()
        .filter(|token| !matches!(token, Token::Whitespace(_) | Token::EOF))
        .collect())
}

fn raw_tokens(sql: &str) -> Result<Vec<Token>> {
    Tokenizer::new(&GenericDialect {}, sql)
        .tokenize()
        .map_err(|e| QueryError::malformed(e.to_string()))
}

/// Splits a script into its `;`-separated statements.
///
/// Each statement is a slice of the original text, so literals keep their
/// escapes. Semicolons inside string literals do not split. Empty
/// statements are dropped.
pub fn split_statements(sql: &str) -> Result<Vec<String>> {
    let tokens = Tokenizer::new(&GenericDialect {}, sql)
        .tokenize_with_location()
        .map_err(|e| QueryError::malformed(e.to_string()))?;

    let mut statements = Vec::new();
    let mut start = 0;
    for TokenWithLocation { token, location } in tokens {
        if token == Token::SemiColon {
            let end = byte_offset(sql, &location);
            push_statement(&mut statements, &sql[start..end]);
            start = end + 1;
        }
    }
    push_statement(&mut statements, &sql[start..]);

    Ok(statements)
}

/// Byte offset of a 1-based line/column (in characters) location.
fn byte_offset(sql: &str, location: &Location) -> usize {
    let preceding_lines = usize::try_from(location.line)
        .unwrap_or(usize::MAX)
        .saturating_sub(1);
    let line_start: usize = sql
        .split_inclusive('\n')
        .take(preceding_lines)
        .map(str::len)
        .sum();
    let column = usize::try_from(location.column)
        .unwrap_or(usize::MAX)
        .saturating_sub(1);
    sql[line_start..]
        .char_indices()
        .nth(column)
        .map_or(sql.len(), |(offset, _)| line_start + offset)
}

fn push_statement(statements: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

// ============================================================================
// Token Helpers
// ============================================================================

/// Returns true if `token` is the unquoted word `keyword`, ignoring case.
pub(crate) fn is_keyword(token: &Token, keyword: &str) -> bool {
    matches!(
        token,
        Token::Word(Word { value, quote_style: None, .. }) if value.eq_ignore_ascii_case(keyword)
    )
}

/// Returns true if the slice starts with the given keywords, in order.
pub(crate) fn starts_with_keywords(tokens: &[Token], keywords: &[&str]) -> bool {
    tokens.len() >= keywords.len()
        && tokens
            .iter()
            .zip(keywords)
            .all(|(token, keyword)| is_keyword(token, keyword))
}

/// The name carried by an identifier token, quoted or not.
pub(crate) fn identifier(token: &Token) -> Option<&str> {
    match token {
        Token::Word(word) => Some(&word.value),
        _ => None,
    }
}

/// Interprets a literal token sequence as a scalar.
///
/// Accepts a number (optionally signed), a quoted string, an unquoted
/// word, or `NULL`. Quoted strings have their quotes stripped before
/// coercion, so `'42'` reads as the number 42. Words pass through
/// coercion unchanged, which makes `true`/`false` booleans.
pub(crate) fn literal(tokens: &[Token]) -> Option<Value> {
    match tokens {
        [Token::Number(n, _)] | [Token::Plus, Token::Number(n, _)] => Some(coerce(n)),
        [Token::Minus, Token::Number(n, _)] => Some(coerce(&format!("-{n}"))),
        [Token::SingleQuotedString(s) | Token::DoubleQuotedString(s)] => Some(coerce(s)),
        [token] if is_keyword(token, "null") => Some(Value::Null),
        [Token::Word(word)] => Some(coerce(&word.value)),
        _ => None,
    }
}

/// Interprets a literal written into a row by VALUES or SET.
///
/// Unlike [`literal`], a quoted token is always text: `'02134'` is stored
/// as written. Unquoted tokens coerce as usual.
pub(crate) fn stored_literal(tokens: &[Token]) -> Option<Value> {
    match tokens {
        [Token::SingleQuotedString(s) | Token::DoubleQuotedString(s)] => {
            Some(Value::Text(s.clone()))
        }
        [Token::Word(word)] if word.quote_style.is_some() => Some(Value::Text(word.value.clone())),
        _ => literal(tokens),
    }
}

/// The raw text of a string-like literal token, used for LIKE patterns.
pub(crate) fn literal_text(tokens: &[Token]) -> Option<String> {
    match tokens {
        [Token::SingleQuotedString(s) | Token::DoubleQuotedString(s)] => Some(s.clone()),
        [Token::Word(word)] if word.quote_style.is_some() => Some(word.value.clone()),
        [Token::Number(n, _)] => Some(n.clone()),
        _ => None,
    }
}

/// Renders tokens back to statement text for diagnostics.
pub(crate) fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
