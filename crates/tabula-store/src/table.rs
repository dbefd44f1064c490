//! Tables: named, ordered sequences of shared rows.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tabula_types::{Record, Value};

use crate::error::Result;
use crate::schema::TableSchema;

/// A stored row.
///
/// Rows are shared cells: an update rewrites the cell's contents, so every
/// holder of the `RowRef` observes the post-update state.
pub type RowRef = Rc<RefCell<Record>>;

/// A named table of rows in insertion order.
#[derive(Debug)]
pub struct Table {
    name: String,
    schema: Option<TableSchema>,
    rows: Vec<RowRef>,
}

impl Table {
    /// Creates an empty table without a schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            rows: Vec::new(),
        }
    }

    /// Creates an empty table with a declared schema.
    pub fn with_schema(name: impl Into<String>, schema: TableSchema) -> Self {
        Self {
            name: name.into(),
            schema: Some(schema),
            rows: Vec::new(),
        }
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared schema, if any.
    pub fn schema(&self) -> Option<&TableSchema> {
        self.schema.as_ref()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The live row sequence.
    pub fn rows(&self) -> &[RowRef] {
        &self.rows
    }

    /// A stable enumeration of the rows as of now.
    ///
    /// Later inserts or deletes do not change the returned list.
    pub fn snapshot(&self) -> Vec<RowRef> {
        tracing::trace!(table = %self.name, rows = self.rows.len(), "snapshot");
        self.rows.clone()
    }

    /// Detached copies of every row, in order.
    pub fn records(&self) -> Vec<Record> {
        self.rows.iter().map(|row| row.borrow().clone()).collect()
    }

    /// Rows for which `matcher` returns true.
    pub fn matching(&self, matcher: impl Fn(&Record) -> bool) -> Vec<RowRef> {
        self.snapshot()
            .into_iter()
            .filter(|row| matcher(&*row.borrow()))
            .collect()
    }

    /// First row whose `field` strictly equals `value`.
    pub fn find_by(&self, field: &str, value: &Value) -> Option<RowRef> {
        self.rows
            .iter()
            .find(|row| row.borrow().get(field) == Some(value))
            .cloned()
    }

    /// Validates a record against the schema, if one is declared.
    pub fn validate(&self, record: &Record) -> Result<()> {
        match &self.schema {
            Some(schema) => schema.validate(&self.name, record),
            None => Ok(()),
        }
    }

    pub(crate) fn append(&mut self, record: Record) -> Result<RowRef> {
        self.validate(&record)?;
        let row = Rc::new(RefCell::new(record));
        self.rows.push(Rc::clone(&row));
        Ok(row)
    }

    /// Applies `changes` to each row in place.
    ///
    /// Each row's merged candidate is validated before it is written; a
    /// violation stops the loop, leaving earlier rows updated.
    pub(crate) fn update_rows(&self, rows: &[RowRef], changes: &Record) -> Result<usize> {
        let mut updated = 0;
        for row in rows {
            let mut candidate = row.borrow().clone();
            candidate.merge(changes);
            self.validate(&candidate)?;
            *row.borrow_mut() = candidate;
            updated += 1;
        }
        Ok(updated)
    }

    pub(crate) fn remove_rows(&mut self, rows: &[RowRef]) -> usize {
        let targets: HashSet<*const RefCell<Record>> = rows.iter().map(Rc::as_ptr).collect();
        let before = self.rows.len();
        self.rows.retain(|row| !targets.contains(&Rc::as_ptr(row)));
        before - self.rows.len()
    }
}
