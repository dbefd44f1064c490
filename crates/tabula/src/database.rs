//! The database handle: one store plus one engine.

use tabula_query::{Param, PreparedStatement, QueryEngine, QueryResult};
use tabula_store::{MemoryStore, Table, TableSchema, TableStore};
use tabula_types::Record;

use crate::config::DatabaseConfig;
use crate::error::Result;

/// An in-memory database.
///
/// Owns its tables; nothing is persisted. A single caller drives it, and
/// each statement runs to completion before the next starts.
#[derive(Debug, Default)]
pub struct Database {
    store: MemoryStore,
    engine: QueryEngine,
}

impl Database {
    /// Creates an empty database with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty database with the given settings.
    pub fn with_config(config: DatabaseConfig) -> Self {
        tracing::debug!(?config, "database created");
        Self {
            store: MemoryStore::with_config(config.store),
            engine: QueryEngine::with_config(config.engine),
        }
    }

    /// Creates a table, optionally with a schema.
    pub fn create_table(&mut self, name: &str, schema: Option<TableSchema>) -> Result<()> {
        Ok(self.store.create_table(name, schema)?)
    }

    /// Removes a table and its rows.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        Ok(self.store.drop_table(name)?)
    }

    /// Table names in creation order.
    pub fn table_names(&self) -> Vec<String> {
        self.store.table_names().map(str::to_string).collect()
    }

    /// Looks up a table.
    pub fn table(&self, name: &str) -> Result<&Table> {
        Ok(self.store.table(name)?)
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    /// Executes one statement.
    pub fn execute(&mut self, sql: &str, params: &[Param]) -> Result<QueryResult> {
        Ok(self.engine.execute(&mut self.store, sql, params)?)
    }

    /// Executes a SELECT and returns its rows.
    pub fn query(&self, sql: &str, params: &[Param]) -> Result<Vec<Record>> {
        Ok(self.engine.query(&self.store, sql, params)?)
    }

    /// Executes `;`-separated statements in order, all with `params`.
    ///
    /// Stops at the first failing statement; earlier statements stay applied.
    pub fn execute_script(&mut self, script: &str, params: &[Param]) -> Result<Vec<QueryResult>> {
        let statements = tabula_query::split_statements(script)?;
        let mut results = Vec::with_capacity(statements.len());
        for sql in &statements {
            results.push(self.execute(sql, params)?);
        }
        Ok(results)
    }

    /// Parses a statement for repeated execution.
    pub fn prepare(&self, sql: &str, params: &[Param]) -> Result<PreparedStatement> {
        Ok(self.engine.prepare(sql, params)?)
    }

    /// Executes a prepared statement.
    pub fn run(&mut self, statement: &PreparedStatement) -> Result<QueryResult> {
        Ok(statement.execute(&mut self.store)?)
    }

    // ------------------------------------------------------------------------
    // Direct store access
    // ------------------------------------------------------------------------

    /// Inserts a record and returns it as stored, identity fields included.
    pub fn insert(&mut self, table: &str, record: Record) -> Result<Record> {
        let row = self.store.insert(table, record)?;
        let stored = row.borrow().clone();
        Ok(stored)
    }

    /// Overlays each record onto the stored row with the same identifier.
    pub fn update_by_id(&mut self, table: &str, records: &[Record]) -> Result<usize> {
        Ok(self.store.update_by_id(table, records)?)
    }

    /// The underlying store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// The underlying store, mutably.
    pub fn store_mut(&mut self) -> &mut MemoryStore {
        &mut self.store
    }
}
