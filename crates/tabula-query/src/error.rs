//! Error types for query operations.

use tabula_store::StoreError;

/// Errors that can occur during statement parsing and execution.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Statement text matches none of the recognized statement shapes.
    #[error("malformed statement: {0}")]
    MalformedStatement(String),

    /// A placeholder refers to a parameter that was not supplied.
    #[error("parameter {0} not provided")]
    ParameterNotFound(usize),

    /// A parameter cannot be used where it appears.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Underlying store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl QueryError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedStatement(message.into())
    }
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
