//! Error types for the tabula facade.
//!
//! Wraps errors from the store and the query engine, plus the failures of
//! loading configuration.

use tabula_query::QueryError;
use tabula_store::StoreError;
use thiserror::Error;

/// Result type for tabula operations.
pub type Result<T> = std::result::Result<T, TabulaError>;

/// Errors that can occur during tabula operations.
#[derive(Debug, Error)]
pub enum TabulaError {
    /// Error from the query engine (parsing/execution).
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Error from the table store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TabulaError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true if the error is a schema violation.
    pub fn is_schema_violation(&self) -> bool {
        matches!(
            self,
            TabulaError::Store(StoreError::SchemaViolation { .. })
                | TabulaError::Query(QueryError::Store(StoreError::SchemaViolation { .. }))
        )
    }
}
