//! GROUP BY partitioning and aggregate functions.

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use tabula_types::{Record, Value};

/// Aggregate functions usable in a SELECT list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    /// Looks up a function by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "avg" => Some(Self::Avg),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    /// Output column used when the SELECT gives no alias.
    pub fn default_alias(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// How a call of this function on `arg` is referenced outside the
    /// SELECT list, e.g. `sum(v)` or `count(*)`.
    pub fn call_name(self, arg: &str) -> String {
        format!("{}({arg})", self.default_alias())
    }

    /// Computes the aggregate of `field` over `rows`.
    ///
    /// COUNT counts rows regardless of `field`. SUM and AVG read values
    /// numerically, non-numeric as zero; AVG divides by the row count. MIN
    /// and MAX skip NULLs. Over zero rows AVG, MIN and MAX are NULL.
    #[allow(clippy::cast_precision_loss)]
    pub fn apply(self, rows: &[Record], field: &str) -> Value {
        match self {
            Self::Count => Value::Number(rows.len() as f64),
            Self::Sum => Value::Number(sum(rows, field)),
            Self::Avg if rows.is_empty() => Value::Null,
            Self::Avg => Value::Number(sum(rows, field) / rows.len() as f64),
            Self::Min => extreme(rows, field, Ordering::Less),
            Self::Max => extreme(rows, field, Ordering::Greater),
        }
    }
}

impl fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.default_alias().to_ascii_uppercase())
    }
}

fn sum(rows: &[Record], field: &str) -> f64 {
    rows.iter().map(|row| row.value(field).to_number()).sum()
}

fn extreme(rows: &[Record], field: &str, wanted: Ordering) -> Value {
    rows.iter()
        .map(|row| row.value(field))
        .filter(|value| !value.is_null())
        .fold(None, |best: Option<&Value>, value| match best {
            Some(current) if value.compare(current) != Some(wanted) => Some(current),
            _ => Some(value),
        })
        .cloned()
        .unwrap_or(Value::Null)
}

// ============================================================================
// Grouping
// ============================================================================

/// Hashable identity of a group key.
///
/// Numbers group by value, so `-0` and `0` share a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Null,
    Boolean(bool),
    Number(u64),
    Text(String),
}

impl From<&Value> for GroupKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => GroupKey::Null,
            Value::Boolean(b) => GroupKey::Boolean(*b),
            Value::Number(n) => GroupKey::Number(if *n == 0.0 { 0.0f64 } else { *n }.to_bits()),
            Value::Text(s) => GroupKey::Text(s.clone()),
        }
    }
}

/// Partitions rows by the value of `key`.
///
/// Groups come out in order of first appearance and keep their rows in
/// input order. Without a key every row lands in one group, which exists
/// even when there are no rows.
pub(crate) fn group_rows(rows: Vec<Record>, key: Option<&str>) -> Vec<Vec<Record>> {
    let Some(key) = key else {
        return vec![rows];
    };
    let mut groups: IndexMap<GroupKey, Vec<Record>> = IndexMap::new();
    for row in rows {
        groups
            .entry(GroupKey::from(row.value(key)))
            .or_default()
            .push(row);
    }
    tracing::debug!(key, groups = groups.len(), "rows grouped");
    groups.into_values().collect()
}
