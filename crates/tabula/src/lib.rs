//! # Tabula
//!
//! An embedded, in-memory relational query engine.
//!
//! Tables live in memory and are manipulated through a small SQL-like
//! language. There is no persistence, indexing or transaction machinery:
//! each statement runs to completion against the current rows.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Database                          │
//! │  ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌──────┐  │
//! │  │  Lexer   │ → │ Statement │ → │ Executor │ → │Store │  │
//! │  │(tokens)  │   │ + clauses │   │(joins,   │   │(rows)│  │
//! │  └──────────┘   └───────────┘   │ groups)  │   └──────┘  │
//! │                                 └──────────┘             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use tabula::{Database, Param};
//!
//! let mut db = Database::new();
//! db.execute(
//!     "INSERT INTO users (name, age) VALUES ('alice', 30), ('bob', 25)",
//!     &[],
//! )
//! .unwrap();
//!
//! let rows = db
//!     .query("SELECT name FROM users WHERE age > ? ORDER BY name", &[Param::from(26)])
//!     .unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

mod config;
mod database;
mod error;

#[cfg(test)]
mod tests;

pub use config::DatabaseConfig;
pub use database::Database;
pub use error::{Result, TabulaError};

// Re-export the value model
pub use tabula_types::{record, DataType, Record, Value};

// Re-export store types
pub use tabula_store::{
    ColumnDef, MemoryStore, RowRef, StoreConfig, StoreError, Table, TableSchema, TableStore,
};

// Re-export query types
pub use tabula_query::{
    EngineConfig, Param, PreparedStatement, QueryEngine, QueryError, QueryResult, Statement,
};
