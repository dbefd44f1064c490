//! # tabula-query: statements over in-memory tables
//!
//! This crate parses and executes a small SQL-like language against any
//! [`TableStore`].
//!
//! ## Statement Subset
//!
//! - `SELECT` with a field list, `*`, aliases and aggregates
//!   (`COUNT`, `SUM`, `AVG`, `MIN`, `MAX`)
//! - one `[INNER|LEFT|RIGHT|FULL] JOIN ... ON a.k = b.k`
//! - `WHERE` / `HAVING` with `=`, `!=`, `<`, `>`, `<=`, `>=`, `[NOT] LIKE`,
//!   `[NOT] IN (...)`, `[NOT] IN (SELECT ...)`, `[NOT] BETWEEN`,
//!   `IS [NOT] NULL`, combined with `AND` / `OR`
//! - `GROUP BY`, `ORDER BY [ASC|DESC]`, `LIMIT`, `OFFSET`
//! - `INSERT`, `UPDATE ... SET ... WHERE`, `DELETE`
//! - Parameters (`?`, `$1`, `$2`, ...)
//!
//! Clauses combine conjunction-first: `a AND b OR c` means `a AND (b OR c)`.
//! A condition that matches no known shape never holds; it is logged, not
//! raised.
//!
//! ## Usage
//!
//! ```
//! use tabula_query::{Param, QueryEngine};
//! use tabula_store::MemoryStore;
//!
//! let engine = QueryEngine::new();
//! let mut store = MemoryStore::new();
//!
//! engine
//!     .execute(&mut store, "INSERT INTO users (name, age) VALUES ('alice', 30)", &[])
//!     .unwrap();
//! let rows = engine
//!     .query(&store, "SELECT name FROM users WHERE age > ?", &[Param::from(18)])
//!     .unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

mod aggregate;
mod clause;
mod coerce;
mod dispatch;
mod error;
mod executor;
mod join;
mod lexer;
mod params;
mod predicate;
mod statement;


// Re-export public types
pub use aggregate::AggregateFunc;
pub use coerce::coerce;
pub use error::{QueryError, Result};
pub use lexer::split_statements;
pub use params::Param;
pub use predicate::{CompareOp, EvalContext, LikePattern, Predicate, Subquery};
pub use statement::{
    parse_statement, DeleteStatement, InsertStatement, JoinKind, JoinSpec, OrderBy,
    SelectField, SelectStatement, Statement, TableRef, UpdateStatement,
};

use serde::{Deserialize, Serialize};
use tabula_store::TableStore;
use tabula_types::Record;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Evaluate each IN-subquery once per statement instead of once per
    /// outer row.
    pub cache_subqueries: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_subqueries: true,
        }
    }
}

impl EngineConfig {
    /// Enables or disables subquery caching.
    #[must_use]
    pub fn with_subquery_cache(mut self, enabled: bool) -> Self {
        self.cache_subqueries = enabled;
        self
    }
}

/// The outcome of a statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryResult {
    /// Rows returned by a SELECT.
    Rows(Vec<Record>),
    /// Rows affected by an INSERT, UPDATE or DELETE.
    Count(usize),
}

impl QueryResult {
    /// The returned rows, if this is a SELECT result.
    pub fn rows(&self) -> Option<&[Record]> {
        match self {
            QueryResult::Rows(rows) => Some(rows),
            QueryResult::Count(_) => None,
        }
    }

    /// Consumes the result, returning its rows (empty for counts).
    pub fn into_rows(self) -> Vec<Record> {
        match self {
            QueryResult::Rows(rows) => rows,
            QueryResult::Count(_) => Vec::new(),
        }
    }

    /// Number of rows returned or affected.
    pub fn count(&self) -> usize {
        match self {
            QueryResult::Rows(rows) => rows.len(),
            QueryResult::Count(n) => *n,
        }
    }
}

/// Query engine for executing statements against a table store.
///
/// The engine holds only configuration; all data lives in the store.
#[derive(Debug, Clone, Default)]
pub struct QueryEngine {
    config: EngineConfig,
}

impl QueryEngine {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Executes any statement.
    ///
    /// SELECT yields [`QueryResult::Rows`]; INSERT, UPDATE and DELETE yield
    /// [`QueryResult::Count`].
    pub fn execute<S: TableStore>(
        &self,
        store: &mut S,
        sql: &str,
        params: &[Param],
    ) -> Result<QueryResult> {
        let statement = parse_statement(sql, params)?;
        dispatch::dispatch(&statement, store, &self.config)
    }

    /// Executes a SELECT without needing write access to the store.
    pub fn query<S: TableStore>(
        &self,
        store: &S,
        sql: &str,
        params: &[Param],
    ) -> Result<Vec<Record>> {
        match parse_statement(sql, params)? {
            Statement::Select(select) => {
                let ctx = EvalContext::new(store, self.config.cache_subqueries);
                executor::execute_select(&select, &ctx)
            }
            _ => Err(QueryError::MalformedStatement(
                "query accepts only SELECT statements".to_string(),
            )),
        }
    }

    /// Parses a statement and binds its parameters without executing it.
    pub fn prepare(&self, sql: &str, params: &[Param]) -> Result<PreparedStatement> {
        Ok(PreparedStatement {
            statement: parse_statement(sql, params)?,
            config: self.config.clone(),
        })
    }
}

/// A parsed statement ready for repeated execution.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    statement: Statement,
    config: EngineConfig,
}

impl PreparedStatement {
    /// Executes this statement against the current store state.
    ///
    /// Subquery results are never reused across executions.
    pub fn execute<S: TableStore>(&self, store: &mut S) -> Result<QueryResult> {
        let statement = self.statement.clone();
        dispatch::dispatch(&statement, store, &self.config)
    }

    /// The parsed statement.
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Returns true if executing this statement cannot modify the store.
    pub fn is_read_only(&self) -> bool {
        self.statement.is_read_only()
    }
}
