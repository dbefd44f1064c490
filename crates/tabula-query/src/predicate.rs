//! Predicate expression trees and their evaluation.

use std::cell::OnceCell;
use std::cmp::Ordering;
use std::fmt;

use regex::{Regex, RegexBuilder};
use tabula_store::TableStore;
use tabula_types::{Record, Value};

use crate::error::Result;

// ============================================================================
// Evaluation Context
// ============================================================================

/// What a predicate may consult besides the record under test.
pub struct EvalContext<'a> {
    store: &'a dyn TableStore,
    cache_subqueries: bool,
}

impl<'a> EvalContext<'a> {
    /// Creates a context over `store`.
    pub fn new(store: &'a dyn TableStore, cache_subqueries: bool) -> Self {
        Self {
            store,
            cache_subqueries,
        }
    }

    /// The store subqueries read from.
    pub fn store(&self) -> &'a dyn TableStore {
        self.store
    }
}

// ============================================================================
// Predicate Tree
// ============================================================================

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl CompareOp {
    fn test(self, left: &Value, right: &Value) -> bool {
        match self {
            CompareOp::Eq => left.loose_eq(right),
            CompareOp::NotEq => !left.loose_eq(right),
            ordered => {
                if left.is_null() || right.is_null() {
                    return false;
                }
                left.compare(right).is_some_and(|ord| match ordered {
                    CompareOp::Lt => ord == Ordering::Less,
                    CompareOp::Gt => ord == Ordering::Greater,
                    CompareOp::LtEq => ord != Ordering::Greater,
                    CompareOp::GtEq => ord != Ordering::Less,
                    CompareOp::Eq | CompareOp::NotEq => false,
                })
            }
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::LtEq => "<=",
            CompareOp::GtEq => ">=",
        })
    }
}

/// A boolean expression over one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field op literal`
    Comparison {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// `field [NOT] LIKE 'pattern'`
    Like {
        field: String,
        pattern: LikePattern,
        negated: bool,
    },
    /// `field [NOT] IN (v1, v2, ...)`
    InList {
        field: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// `field [NOT] BETWEEN low AND high`, inclusive.
    Between {
        field: String,
        low: Value,
        high: Value,
        negated: bool,
    },
    /// `field IS [NOT] NULL`
    NullCheck { field: String, negated: bool },
    /// `field [NOT] IN (SELECT ...)`
    InSubquery {
        field: String,
        subquery: Box<Subquery>,
        negated: bool,
    },
    /// True when every child is true.
    And(Vec<Predicate>),
    /// True when at least one child is true.
    Or(Vec<Predicate>),
    /// Clause text that matched no known shape. Never true.
    Unmatched(String),
}

impl Predicate {
    /// Evaluates the predicate against a record.
    ///
    /// Only subqueries can fail, when they name a missing table.
    pub fn evaluate(&self, record: &Record, ctx: &EvalContext<'_>) -> Result<bool> {
        Ok(match self {
            Predicate::Comparison { field, op, value } => op.test(record.value(field), value),
            Predicate::Like {
                field,
                pattern,
                negated,
            } => pattern.matches(record.value(field)) != *negated,
            Predicate::InList {
                field,
                values,
                negated,
            } => values.contains(record.value(field)) != *negated,
            Predicate::Between {
                field,
                low,
                high,
                negated,
            } => in_range(record.value(field), low, high) != *negated,
            Predicate::NullCheck { field, negated } => record.is_null(field) != *negated,
            Predicate::InSubquery {
                field,
                subquery,
                negated,
            } => subquery.contains(record.value(field), ctx)? != *negated,
            Predicate::And(children) => {
                for child in children {
                    if !child.evaluate(record, ctx)? {
                        return Ok(false);
                    }
                }
                true
            }
            Predicate::Or(children) => {
                for child in children {
                    if child.evaluate(record, ctx)? {
                        return Ok(true);
                    }
                }
                false
            }
            Predicate::Unmatched(_) => false,
        })
    }

    /// Every field name the predicate reads, outside subqueries.
    pub(crate) fn fields_mut(&mut self) -> Vec<&mut String> {
        match self {
            Predicate::Comparison { field, .. }
            | Predicate::Like { field, .. }
            | Predicate::InList { field, .. }
            | Predicate::Between { field, .. }
            | Predicate::NullCheck { field, .. }
            | Predicate::InSubquery { field, .. } => vec![field],
            Predicate::And(children) | Predicate::Or(children) => children
                .iter_mut()
                .flat_map(Predicate::fields_mut)
                .collect(),
            Predicate::Unmatched(_) => Vec::new(),
        }
    }
}

fn in_range(value: &Value, low: &Value, high: &Value) -> bool {
    if value.is_null() {
        return false;
    }
    let above = value
        .compare(low)
        .is_some_and(|ord| ord != Ordering::Less);
    let below = value
        .compare(high)
        .is_some_and(|ord| ord != Ordering::Greater);
    above && below
}

// ============================================================================
// LIKE Patterns
// ============================================================================

/// A LIKE pattern compiled to a case-insensitive whole-string match.
///
/// `%` matches any sequence; every other character matches itself.
#[derive(Clone)]
pub struct LikePattern {
    source: String,
    regex: Option<Regex>,
}

impl LikePattern {
    /// Compiles a LIKE pattern.
    ///
    /// A pattern that fails to compile matches nothing.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut translated = String::from("^");
        for ch in source.chars() {
            if ch == '%' {
                translated.push_str(".*");
            } else {
                translated.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4])));
            }
        }
        translated.push('$');

        let regex = RegexBuilder::new(&translated)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| tracing::warn!(pattern = %source, error = %e, "LIKE pattern rejected"))
            .ok();

        Self { source, regex }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Tests a value. NULL never matches.
    pub fn matches(&self, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }
        self.regex
            .as_ref()
            .is_some_and(|regex| regex.is_match(&value.to_string()))
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for LikePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LikePattern").field(&self.source).finish()
    }
}

// ============================================================================
// Subqueries
// ============================================================================

/// `SELECT field FROM table [WHERE filter]` used as a value set.
pub struct Subquery {
    pub table: String,
    pub field: String,
    pub filter: Option<Predicate>,
    cache: OnceCell<Vec<Value>>,
}

impl Subquery {
    pub fn new(
        table: impl Into<String>,
        field: impl Into<String>,
        filter: Option<Predicate>,
    ) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            filter,
            cache: OnceCell::new(),
        }
    }

    /// Tests membership of `value` in the subquery's column.
    ///
    /// Membership is strict equality. With caching enabled the column is
    /// read once per statement; otherwise it is re-read per call.
    fn contains(&self, value: &Value, ctx: &EvalContext<'_>) -> Result<bool> {
        if let Some(values) = self.cache.get() {
            return Ok(values.contains(value));
        }
        let values = self.values(ctx)?;
        let found = values.contains(value);
        if ctx.cache_subqueries {
            let _ = self.cache.set(values);
        }
        Ok(found)
    }

    fn values(&self, ctx: &EvalContext<'_>) -> Result<Vec<Value>> {
        let table = ctx.store.table(&self.table)?;
        let mut values = Vec::new();
        for row in table.snapshot() {
            let row = row.borrow();
            let keep = match &self.filter {
                Some(filter) => filter.evaluate(&row, ctx)?,
                None => true,
            };
            if keep {
                values.push(row.value(&self.field).clone());
            }
        }
        tracing::debug!(table = %self.table, values = values.len(), "subquery evaluated");
        Ok(values)
    }
}

/// Clones start with an empty cache, so a reused statement re-reads the
/// table on its next execution.
impl Clone for Subquery {
    fn clone(&self) -> Self {
        Self::new(self.table.clone(), self.field.clone(), self.filter.clone())
    }
}

impl PartialEq for Subquery {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.field == other.field && self.filter == other.filter
    }
}

impl fmt::Debug for Subquery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subquery")
            .field("table", &self.table)
            .field("field", &self.field)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_store::MemoryStore;
    use tabula_types::record;

    fn eval(predicate: &Predicate, record: &Record) -> bool {
        let store = MemoryStore::new();
        predicate
            .evaluate(record, &EvalContext::new(&store, true))
            .unwrap()
    }

    fn cmp(field: &str, op: CompareOp, value: impl Into<Value>) -> Predicate {
        Predicate::Comparison {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    #[test]
    fn equality_is_loose() {
        let row = record! { "age" => "30" };
        assert!(eval(&cmp("age", CompareOp::Eq, 30), &row));
        assert!(!eval(&cmp("age", CompareOp::NotEq, 30), &row));
    }

    #[test]
    fn ordered_comparison_rejects_null() {
        let row = record! { "age" => Value::Null };
        assert!(!eval(&cmp("age", CompareOp::Lt, 10), &row));
        assert!(!eval(&cmp("missing", CompareOp::GtEq, 0), &row));
    }

    #[test]
    fn ordered_comparison() {
        let row = record! { "age" => 30 };
        assert!(eval(&cmp("age", CompareOp::GtEq, 30), &row));
        assert!(eval(&cmp("age", CompareOp::Gt, 29.5), &row));
        assert!(!eval(&cmp("age", CompareOp::Lt, 30), &row));
        assert!(eval(&cmp("age", CompareOp::LtEq, "30"), &row));
    }

    #[test]
    fn like_is_case_insensitive_and_anchored() {
        let pattern = LikePattern::new("a%");
        assert!(pattern.matches(&Value::from("Alice")));
        assert!(!pattern.matches(&Value::from("Bob")));
        assert!(!pattern.matches(&Value::from("bAlice")));
        assert!(!pattern.matches(&Value::Null));
    }

    #[test]
    fn like_escapes_regex_syntax() {
        let pattern = LikePattern::new("a.c%");
        assert!(pattern.matches(&Value::from("a.cde")));
        assert!(!pattern.matches(&Value::from("abcde")));
    }

    #[test]
    fn like_matches_number_text() {
        assert!(LikePattern::new("4%").matches(&Value::from(42)));
    }

    #[test]
    fn in_list_is_strict() {
        let predicate = Predicate::InList {
            field: "age".to_string(),
            values: vec![Value::from(30), Value::from(40)],
            negated: false,
        };
        assert!(eval(&predicate, &record! { "age" => 30 }));
        assert!(!eval(&predicate, &record! { "age" => "30" }));
    }

    #[test]
    fn between_is_inclusive() {
        let predicate = Predicate::Between {
            field: "age".to_string(),
            low: Value::from(20),
            high: Value::from(30),
            negated: false,
        };
        assert!(eval(&predicate, &record! { "age" => 20 }));
        assert!(eval(&predicate, &record! { "age" => 30 }));
        assert!(!eval(&predicate, &record! { "age" => 31 }));
        assert!(!eval(&predicate, &record! { "age" => Value::Null }));
    }

    #[test]
    fn null_check_covers_absent_fields() {
        let predicate = Predicate::NullCheck {
            field: "email".to_string(),
            negated: false,
        };
        assert!(eval(&predicate, &record! { "name" => "a" }));
        assert!(eval(&predicate, &record! { "email" => Value::Null }));
        assert!(!eval(&predicate, &record! { "email" => "a@b" }));
    }

    #[test]
    fn unmatched_is_never_true() {
        assert!(!eval(&Predicate::Unmatched("???".to_string()), &record! { "a" => 1 }));
        assert!(!eval(
            &Predicate::Or(vec![Predicate::Unmatched("x".to_string())]),
            &record! {}
        ));
    }

    #[test]
    fn empty_combinators() {
        assert!(eval(&Predicate::And(vec![]), &record! {}));
        assert!(!eval(&Predicate::Or(vec![]), &record! {}));
    }

    #[test]
    fn subquery_membership() {
        let mut store = MemoryStore::new();
        store.insert("banned", record! { "name" => "bob" }).unwrap();
        let predicate = Predicate::InSubquery {
            field: "name".to_string(),
            subquery: Box::new(Subquery::new("banned", "name", None)),
            negated: false,
        };
        let ctx = EvalContext::new(&store, false);
        assert!(predicate.evaluate(&record! { "name" => "bob" }, &ctx).unwrap());
        assert!(!predicate.evaluate(&record! { "name" => "amy" }, &ctx).unwrap());
    }

    #[test]
    fn subquery_missing_table_fails() {
        let store = MemoryStore::new();
        let predicate = Predicate::InSubquery {
            field: "name".to_string(),
            subquery: Box::new(Subquery::new("nope", "name", None)),
            negated: false,
        };
        let ctx = EvalContext::new(&store, true);
        assert!(predicate.evaluate(&record! { "name" => "bob" }, &ctx).is_err());
    }

    #[test]
    fn cloned_subquery_drops_cache() {
        let mut store = MemoryStore::new();
        store.insert("ids", record! { "v" => 1 }).unwrap();
        let subquery = Subquery::new("ids", "v", None);
        {
            let ctx = EvalContext::new(&store, true);
            assert!(subquery.contains(&Value::from(1), &ctx).unwrap());
        }
        store.insert("ids", record! { "v" => 2 }).unwrap();

        let ctx = EvalContext::new(&store, true);
        assert!(!subquery.contains(&Value::from(2), &ctx).unwrap());
        assert!(subquery.clone().contains(&Value::from(2), &ctx).unwrap());
    }
}
