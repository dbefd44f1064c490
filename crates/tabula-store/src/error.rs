//! Error types for store operations.

/// Errors that can occur during store operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Table not found.
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// Table already exists.
    #[error("table '{0}' already exists")]
    TableExists(String),

    /// A record does not satisfy the table's declared schema.
    #[error("schema violation in table '{table}', field '{field}': {reason}")]
    SchemaViolation {
        table: String,
        field: String,
        reason: String,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
