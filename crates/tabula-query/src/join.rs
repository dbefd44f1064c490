//! Nested-loop equi-joins.
//!
//! Joined rows carry every field of both sides qualified as `alias.field`.
//! Outer joins pad the missing side with NULLs shaped like that table's
//! first row; when the table is empty the padding has no fields.

use tabula_store::TableStore;
use tabula_types::{Record, Value};

use crate::error::Result;
use crate::statement::{JoinSpec, TableRef};

/// Resolves `from JOIN spec` into detached joined rows.
pub(crate) fn join_tables(
    store: &dyn TableStore,
    from: &TableRef,
    spec: &JoinSpec,
) -> Result<Vec<Record>> {
    let left = store.table(&from.name)?.records();
    let right = store.table(&spec.right.name)?.records();
    let rows = join_rows(&left, from.qualifier(), &right, spec.right.qualifier(), spec);

    tracing::debug!(
        left = left.len(),
        right = right.len(),
        joined = rows.len(),
        kind = ?spec.kind,
        "tables joined"
    );
    Ok(rows)
}

fn join_rows(
    left: &[Record],
    left_alias: &str,
    right: &[Record],
    right_alias: &str,
    spec: &JoinSpec,
) -> Vec<Record> {
    let left_padding = padding(left, left_alias);
    let right_padding = padding(right, right_alias);
    let mut right_matched = vec![false; right.len()];
    let mut rows = Vec::new();

    for l in left {
        let mut matched = false;
        for (i, r) in right.iter().enumerate() {
            if keys_match(l.get(&spec.left_key), r.get(&spec.right_key)) {
                matched = true;
                right_matched[i] = true;
                rows.push(merge(l.qualified(left_alias), &r.qualified(right_alias)));
            }
        }
        if !matched && spec.kind.keeps_left() {
            rows.push(merge(l.qualified(left_alias), &right_padding));
        }
    }

    if spec.kind.keeps_right() {
        for (r, _) in right.iter().zip(&right_matched).filter(|(_, m)| !**m) {
            rows.push(merge(left_padding.clone(), &r.qualified(right_alias)));
        }
    }

    rows
}

/// Join keys match on strict equality; NULL or absent keys never match.
fn keys_match(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (Some(l), Some(r)) => !l.is_null() && l == r,
        _ => false,
    }
}

fn padding(rows: &[Record], alias: &str) -> Record {
    rows.first()
        .map(|row| row.qualified(alias).null_template())
        .unwrap_or_default()
}

fn merge(mut base: Record, other: &Record) -> Record {
    base.merge(other);
    base
}
