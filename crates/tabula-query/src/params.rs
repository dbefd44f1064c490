//! Statement parameters and placeholder binding.
//!
//! Placeholders are substituted before any clause is parsed. A scalar
//! parameter becomes a literal token (text is quoted, everything else is
//! bare), so bound values go through the same coercion as literal text.
//! Record parameters feed `INSERT INTO <table> ?`.

use serde::Deserialize;
use sqlparser::tokenizer::Token;
use tabula_types::{format_number, Record, Value};

use crate::error::{QueryError, Result};
use crate::lexer::is_keyword;

/// A value supplied for a placeholder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Param {
    /// A scalar substituted into the statement text.
    Value(Value),
    /// A single record to insert.
    Record(Record),
    /// Several records to insert.
    Records(Vec<Record>),
}

impl Param {
    fn into_records(self) -> Option<Vec<Record>> {
        match self {
            Param::Value(_) => None,
            Param::Record(record) => Some(vec![record]),
            Param::Records(records) => Some(records),
        }
    }
}

macro_rules! scalar_param {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Param {
                fn from(value: $ty) -> Self {
                    Param::Value(value.into())
                }
            }
        )+
    };
}

scalar_param!(Value, f64, i64, i32, bool, String, &str);

impl From<Record> for Param {
    fn from(record: Record) -> Self {
        Param::Record(record)
    }
}

impl From<Vec<Record>> for Param {
    fn from(records: Vec<Record>) -> Self {
        Param::Records(records)
    }
}

/// A token stream with every placeholder resolved.
#[derive(Debug, Default)]
pub(crate) struct Bound {
    pub tokens: Vec<Token>,
    /// Records bound to `INSERT INTO <table> ?`.
    pub records: Option<Vec<Record>>,
}

/// Resolves placeholders against the supplied parameters.
///
/// `?` takes the next parameter in order; `$N` and `?N` take the N-th
/// (1-based) parameter.
pub(crate) fn bind(tokens: Vec<Token>, params: &[Param]) -> Result<Bound> {
    let mut bound = Bound::default();
    let mut next = 0;

    for token in tokens {
        let Token::Placeholder(text) = &token else {
            bound.tokens.push(token);
            continue;
        };

        let index = placeholder_index(text, &mut next)?;
        let param = params
            .get(index)
            .ok_or(QueryError::ParameterNotFound(index + 1))?;

        match param {
            Param::Value(value) => bound.tokens.push(literal_token(value)),
            Param::Record(_) | Param::Records(_) if follows_insert_target(&bound.tokens) => {
                bound
                    .records
                    .get_or_insert_with(Vec::new)
                    .extend(param.clone().into_records().unwrap_or_default());
            }
            Param::Record(_) | Param::Records(_) => {
                return Err(QueryError::InvalidParameter(format!(
                    "parameter {} is a record but appears where a scalar is expected",
                    index + 1
                )));
            }
        }
    }

    Ok(bound)
}

/// Records supplied as parameters, for an INSERT without a placeholder.
pub(crate) fn records_from(params: &[Param]) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (i, param) in params.iter().enumerate() {
        let Some(batch) = param.clone().into_records() else {
            return Err(QueryError::InvalidParameter(format!(
                "parameter {} is a scalar but INSERT expects records",
                i + 1
            )));
        };
        records.extend(batch);
    }
    Ok(records)
}

fn placeholder_index(text: &str, next: &mut usize) -> Result<usize> {
    let digits = text.trim_start_matches(['?', '$']);
    if digits.is_empty() {
        let index = *next;
        *next += 1;
        return Ok(index);
    }
    match digits.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(QueryError::malformed(format!("invalid placeholder '{text}'"))),
    }
}

/// True if the preceding tokens are `INTO <table>`.
fn follows_insert_target(tokens: &[Token]) -> bool {
    matches!(tokens, [.., into, Token::Word(_)] if is_keyword(into, "into"))
}

fn literal_token(value: &Value) -> Token {
    match value {
        Value::Null => Token::make_word("NULL", None),
        Value::Boolean(b) => Token::make_word(&b.to_string(), None),
        Value::Number(n) => Token::Number(format_number(*n), false),
        Value::Text(s) => Token::SingleQuotedString(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{literal, tokenize};
    use tabula_types::record;

    fn bind_sql(sql: &str, params: &[Param]) -> Result<Bound> {
        bind(tokenize(sql).unwrap(), params)
    }

    #[test]
    fn positional_placeholders_bind_in_order() {
        let bound = bind_sql("a = ? AND b = ?", &[Param::from(1), Param::from("x")]).unwrap();
        assert_eq!(literal(&bound.tokens[2..3]), Some(Value::from(1)));
        assert_eq!(literal(&bound.tokens[6..7]), Some(Value::from("x")));
    }

    #[test]
    fn numbered_placeholders_bind_by_index() {
        let bound = bind_sql("a = $2 AND b = $1", &[Param::from(1), Param::from(2)]).unwrap();
        assert_eq!(literal(&bound.tokens[2..3]), Some(Value::from(2)));
        assert_eq!(literal(&bound.tokens[6..7]), Some(Value::from(1)));
    }

    #[test]
    fn null_and_boolean_bind_bare() {
        let bound = bind_sql("? ?", &[Param::from(Value::Null), Param::from(true)]).unwrap();
        assert_eq!(literal(&bound.tokens[0..1]), Some(Value::Null));
        assert_eq!(literal(&bound.tokens[1..2]), Some(Value::Boolean(true)));
    }

    #[test]
    fn text_binds_quoted() {
        let bound = bind_sql("?", &[Param::from("NULL")]).unwrap();
        assert_eq!(literal(&bound.tokens), Some(Value::from("NULL")));
    }

    #[test]
    fn missing_parameter() {
        assert_eq!(
            bind_sql("a = ? AND b = ?", &[Param::from(1)]).unwrap_err(),
            QueryError::ParameterNotFound(2)
        );
        assert_eq!(
            bind_sql("a = $3", &[]).unwrap_err(),
            QueryError::ParameterNotFound(3)
        );
    }

    #[test]
    fn record_binds_after_insert_target() {
        let bound = bind_sql(
            "INSERT INTO users ?",
            &[Param::from(record! { "name" => "alice" })],
        )
        .unwrap();
        assert_eq!(bound.tokens.len(), 3);
        assert_eq!(bound.records.map(|r| r.len()), Some(1));
    }

    #[test]
    fn record_in_scalar_position_is_invalid() {
        let err = bind_sql("a = ?", &[Param::from(record! { "a" => 1 })]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter(_)));
    }

    #[test]
    fn params_deserialize_by_shape() {
        let params: Vec<Param> =
            serde_json::from_str(r#"[1, "x", null, {"a": 1}, [{"a": 2}, {"a": 3}]]"#).unwrap();
        assert_eq!(params[0], Param::from(1));
        assert_eq!(params[1], Param::from("x"));
        assert_eq!(params[2], Param::Value(Value::Null));
        assert_eq!(params[3], Param::from(record! { "a" => 1 }));
        assert!(matches!(&params[4], Param::Records(r) if r.len() == 2));
    }
}
