//! SELECT execution.
//!
//! The pipeline runs source, WHERE, then either grouping (with HAVING) or
//! projection, then ORDER BY, OFFSET and LIMIT. Every stage works on
//! detached copies, so result rows never alias stored rows.

use std::cmp::Ordering;

use tabula_types::{Record, Value};

use crate::aggregate::group_rows;
use crate::error::Result;
use crate::join::join_tables;
use crate::predicate::{EvalContext, Predicate};
use crate::statement::{OrderBy, SelectField, SelectStatement};

/// Executes a SELECT statement.
pub(crate) fn execute_select(
    select: &SelectStatement,
    ctx: &EvalContext<'_>,
) -> Result<Vec<Record>> {
    let source = match &select.join {
        Some(spec) => join_tables(ctx.store(), &select.from, spec)?,
        None => ctx.store().table(&select.from.name)?.records(),
    };
    let scanned = source.len();

    let rows = filter(source, select.filter.as_ref(), ctx)?;
    let filtered = rows.len();

    let mut rows = if select.group_by.is_some() || select.has_aggregates() {
        let grouped = aggregate(select, rows);
        let grouped = filter(grouped, select.having.as_ref(), ctx)?;
        sort(grouped, select.order_by.as_ref())
    } else {
        project(select, rows, ctx)?
    };

    if let Some(offset) = select.offset {
        let skip = offset.min(rows.len());
        rows.drain(..skip);
    }
    if let Some(limit) = select.limit {
        rows.truncate(limit);
    }

    tracing::debug!(
        table = %select.from.name,
        scanned,
        filtered,
        returned = rows.len(),
        "select executed"
    );
    Ok(rows)
}

fn filter(
    rows: Vec<Record>,
    predicate: Option<&Predicate>,
    ctx: &EvalContext<'_>,
) -> Result<Vec<Record>> {
    let Some(predicate) = predicate else {
        return Ok(rows);
    };
    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        if predicate.evaluate(&row, ctx)? {
            kept.push(row);
        }
    }
    Ok(kept)
}

// ============================================================================
// Grouping
// ============================================================================

/// One output row per group.
///
/// Plain fields take the value from the group's first row, which for the
/// GROUP BY field is the group key itself.
fn aggregate(select: &SelectStatement, rows: Vec<Record>) -> Vec<Record> {
    group_rows(rows, select.group_by.as_deref())
        .into_iter()
        .map(|group| {
            let first = group.first();
            let mut out = Record::new();
            for field in &select.fields {
                match field {
                    SelectField::Wildcard => {
                        if let Some(first) = first {
                            out.merge(first);
                        }
                    }
                    SelectField::Field { name, alias } => {
                        let value = first.map_or(Value::Null, |row| row.value(name).clone());
                        out.insert(alias.as_deref().unwrap_or(name), value);
                    }
                    SelectField::Aggregate { func, arg, alias } => {
                        let name = alias.as_deref().unwrap_or(func.default_alias());
                        out.insert(name, func.apply(&group, arg));
                    }
                }
            }
            out
        })
        .collect()
}

// ============================================================================
// Projection
// ============================================================================

/// Projects rows, applying HAVING and ORDER BY to the projected output.
///
/// Sorting may name a field that was not projected; such keys are read
/// from the source row.
fn project(
    select: &SelectStatement,
    rows: Vec<Record>,
    ctx: &EvalContext<'_>,
) -> Result<Vec<Record>> {
    let mut pairs = Vec::with_capacity(rows.len());
    for source in rows {
        let projected = project_row(&select.fields, &source);
        let keep = match &select.having {
            Some(having) => having.evaluate(&projected, ctx)?,
            None => true,
        };
        if keep {
            pairs.push((source, projected));
        }
    }

    if let Some(order) = &select.order_by {
        let key = |(source, projected): &(Record, Record)| -> Value {
            projected
                .resolve(&order.field)
                .unwrap_or_else(|| source.value(&order.field))
                .clone()
        };
        sort_by_key_value(&mut pairs, order, key);
    }

    Ok(pairs.into_iter().map(|(_, projected)| projected).collect())
}

fn project_row(fields: &[SelectField], source: &Record) -> Record {
    let mut out = Record::new();
    for field in fields {
        match field {
            SelectField::Wildcard => out.merge(source),
            SelectField::Field { name, alias } => {
                out.insert(alias.as_deref().unwrap_or(name), source.value(name).clone());
            }
            SelectField::Aggregate { .. } => {}
        }
    }
    out
}

// ============================================================================
// Ordering
// ============================================================================

fn sort(mut rows: Vec<Record>, order: Option<&OrderBy>) -> Vec<Record> {
    if let Some(order) = order {
        sort_by_key_value(&mut rows, order, |row| row.value(&order.field).clone());
    }
    rows
}

/// Stable sort by the value `key` extracts. Incomparable values tie.
fn sort_by_key_value<T>(items: &mut [T], order: &OrderBy, key: impl Fn(&T) -> Value) {
    items.sort_by(|a, b| {
        let ord = key(a).compare(&key(b)).unwrap_or(Ordering::Equal);
        if order.descending {
            ord.reverse()
        } else {
            ord
        }
    });
}
