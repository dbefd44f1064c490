//! Routes parsed statements to the executor or to store mutations.
//!
//! UPDATE and DELETE decide which rows they touch against a snapshot taken
//! before any write, then hand exactly those rows to the store.

use tabula_store::{RowRef, Table, TableStore};

use crate::error::Result;
use crate::executor::execute_select;
use crate::predicate::{EvalContext, Predicate};
use crate::statement::Statement;
use crate::{EngineConfig, QueryResult};

/// Executes a statement against `store`.
pub(crate) fn dispatch<S: TableStore>(
    statement: &Statement,
    store: &mut S,
    config: &EngineConfig,
) -> Result<QueryResult> {
    tracing::debug!(
        table = statement.table(),
        read_only = statement.is_read_only(),
        "dispatching statement"
    );
    match statement {
        Statement::Select(select) => {
            let ctx = EvalContext::new(&*store, config.cache_subqueries);
            Ok(QueryResult::Rows(execute_select(select, &ctx)?))
        }
        Statement::Insert(insert) => {
            let inserted = store.insert_many(&insert.table, insert.records.clone())?;
            Ok(QueryResult::Count(inserted.len()))
        }
        Statement::Update(update) => {
            let rows = {
                let ctx = EvalContext::new(&*store, config.cache_subqueries);
                matching_rows(store.table(&update.table)?, Some(&update.filter), &ctx)?
            };
            let updated = store.update_rows(&update.table, &rows, &update.assignments)?;
            Ok(QueryResult::Count(updated))
        }
        Statement::Delete(delete) => {
            let rows = {
                let ctx = EvalContext::new(&*store, config.cache_subqueries);
                matching_rows(store.table(&delete.table)?, delete.filter.as_ref(), &ctx)?
            };
            let deleted = store.delete_rows(&delete.table, &rows)?;
            Ok(QueryResult::Count(deleted))
        }
    }
}

/// Rows of `table` satisfying `filter`; every row when there is none.
fn matching_rows(
    table: &Table,
    filter: Option<&Predicate>,
    ctx: &EvalContext<'_>,
) -> Result<Vec<RowRef>> {
    let mut rows = Vec::new();
    for row in table.snapshot() {
        let keep = match filter {
            Some(predicate) => predicate.evaluate(&row.borrow(), ctx)?,
            None => true,
        };
        if keep {
            rows.push(row);
        }
    }
    Ok(rows)
}
