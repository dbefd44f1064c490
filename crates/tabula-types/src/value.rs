//! Typed scalar values.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize, Serializer};

/// A scalar value stored in a record field.
///
/// Every comparison, predicate and aggregate in the engine operates on this
/// type. Numbers are always `f64`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent or explicitly null.
    #[default]
    Null,
    /// Boolean value.
    Boolean(bool),
    /// Numeric value.
    Number(f64),
    /// UTF-8 text.
    Text(String),
}

/// Declared type of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Any numeric value.
    Number,
    /// UTF-8 text.
    Text,
    /// Boolean value.
    Boolean,
}

impl Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Number => write!(f, "NUMBER"),
            DataType::Text => write!(f, "TEXT"),
            DataType::Boolean => write!(f, "BOOLEAN"),
        }
    }
}

impl Value {
    /// Returns the data type of this value.
    ///
    /// Returns `None` for `Null` since NULL has no type.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Number(_) => Some(DataType::Number),
            Value::Text(_) => Some(DataType::Text),
        }
    }

    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value as an f64, if it is a `Number`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a bool, if it is `Boolean`.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view used by mixed-type comparisons.
    ///
    /// Booleans count as 1/0 and text is numeric only when the whole string
    /// is a numeral.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Boolean(b) => Some(f64::from(u8::from(*b))),
            Value::Number(n) => Some(*n),
            Value::Text(s) => parse_numeral(s),
        }
    }

    /// Numeric conversion for SUM and AVG: anything non-numeric is 0.
    pub fn to_number(&self) -> f64 {
        match self.as_numeric() {
            Some(n) if !n.is_nan() => n,
            _ => 0.0,
        }
    }

    /// Loose (coercing) equality.
    ///
    /// Values of the same type compare directly. Mixed types compare through
    /// their numeric view, so `Number(1)`, `Text("1")` and `Boolean(true)`
    /// are all loosely equal. NULL is loosely equal only to NULL.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (a, b) => match (a.as_numeric(), b.as_numeric()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// Compares two values for ordering.
    ///
    /// NULL values are considered less than all non-NULL values. Text
    /// compares lexicographically with text; every other pairing compares
    /// through the numeric view and is `None` when either side has none.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (a, b) => {
                let (x, y) = (a.as_numeric()?, b.as_numeric()?);
                x.partial_cmp(&y)
            }
        }
    }

    /// Checks if this value can be stored in a column of the given type.
    pub fn is_compatible_with(&self, data_type: DataType) -> bool {
        match self.data_type() {
            None => true,
            Some(actual) => actual == data_type,
        }
    }
}

/// Parses a full-string numeral such as `42`, `-3.5` or `1e3`.
///
/// Words that Rust's float parser would accept (`inf`, `NaN`) are rejected.
pub fn parse_numeral(text: &str) -> Option<f64> {
    let first = text.chars().next()?;
    if !(first.is_ascii_digit() || matches!(first, '-' | '+' | '.')) {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Formats a number without a trailing `.0` when it is integral.
#[allow(clippy::cast_possible_truncation)]
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl Serialize for Value {
    #[allow(clippy::cast_possible_truncation)]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
