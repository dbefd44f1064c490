//! # tabula-store: In-memory table storage
//!
//! This crate holds the tables a query runs against. Key features:
//!
//! - **Named tables**: insertion-ordered rows, created on first insert
//! - **Shared rows**: updates are visible through every handle to a row
//! - **Optional schemas**: typed columns checked on insert and update
//! - **Stamping**: inserted rows receive an `id` and `created_at` when absent
//!
//! # Usage
//!
//! ```
//! use tabula_store::{MemoryStore, TableStore};
//! use tabula_types::record;
//!
//! let mut store = MemoryStore::new();
//! store.insert("users", record! { "name" => "alice" }).unwrap();
//!
//! let users = store.table("users").unwrap();
//! assert_eq!(users.len(), 1);
//! assert!(users.rows()[0].borrow().contains("id"));
//! ```

mod error;
mod schema;
mod store;
mod table;

#[cfg(test)]
mod tests;

// Public API
pub use error::{Result, StoreError};
pub use schema::{ColumnDef, TableSchema};
pub use store::{MemoryStore, StoreConfig};
pub use table::{RowRef, Table};

use tabula_types::Record;

/// Trait for stores the query engine reads from and writes to.
///
/// Reads borrow the store immutably so a statement can evaluate its
/// predicates (including subqueries against other tables) before any
/// mutation is applied.
pub trait TableStore {
    /// Looks up a table by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableNotFound`] if no such table exists.
    fn table(&self, name: &str) -> Result<&Table>;

    /// Inserts a record and returns a handle to the stored row.
    ///
    /// Implementations may stamp identity fields before storing.
    fn insert(&mut self, table: &str, record: Record) -> Result<RowRef>;

    /// Inserts records in order.
    ///
    /// Stops at the first failure; records before it stay inserted.
    fn insert_many(&mut self, table: &str, records: Vec<Record>) -> Result<Vec<RowRef>> {
        records
            .into_iter()
            .map(|record| self.insert(table, record))
            .collect()
    }

    /// Overlays `changes` onto each of `rows` in place.
    fn update_rows(&mut self, table: &str, rows: &[RowRef], changes: &Record) -> Result<usize>;

    /// Overlays each record onto the stored row with the same identifier.
    ///
    /// Records without an identifier, or whose identifier matches no row,
    /// are skipped.
    fn update_by_id(&mut self, table: &str, records: &[Record]) -> Result<usize>;

    /// Removes the given rows from a table.
    fn delete_rows(&mut self, table: &str, rows: &[RowRef]) -> Result<usize>;

    /// Updates every row for which `matcher` returns true.
    fn update_where(
        &mut self,
        table: &str,
        matcher: impl Fn(&Record) -> bool,
        changes: &Record,
    ) -> Result<usize>
    where
        Self: Sized,
    {
        let rows = self.table(table)?.matching(matcher);
        self.update_rows(table, &rows, changes)
    }

    /// Deletes every row for which `matcher` returns true.
    fn delete_where(&mut self, table: &str, matcher: impl Fn(&Record) -> bool) -> Result<usize>
    where
        Self: Sized,
    {
        let rows = self.table(table)?.matching(matcher);
        self.delete_rows(table, &rows)
    }
}
