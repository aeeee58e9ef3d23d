//! Error types for pgscope

use thiserror::Error;

/// Result type alias for pgscope operations
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Error types for scope compilation and execution
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Malformed filter shape (wrong key count, missing field, non-scalar value)
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Operator key outside the filter vocabulary
    #[error("Unknown filter operator: {0}")]
    UnknownOperator(String),

    /// Malformed scope (empty table name, bad order entry)
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// Builder validation error (bad identifier, empty SET clause)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Broken invariant between the generated SQL and the executor's answer
    #[error("Internal error: {0}")]
    Internal(String),

    /// Operation intentionally not provided
    #[error("Not supported: {0}")]
    Unsupported(&'static str),

    /// Failure reported by a custom executor
    #[error("Executor error: {0}")]
    Executor(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl ConnectorError {
    /// Create an invalid filter error
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter(message.into())
    }

    /// Create an invalid scope error
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::InvalidScope(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an internal (contract violation) error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an executor error
    pub fn executor(message: impl Into<String>) -> Self {
        Self::Executor(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Check if this error was caused by caller input
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidFilter(_)
                | Self::UnknownOperator(_)
                | Self::InvalidScope(_)
                | Self::Validation(_)
        )
    }

    /// Check if this is an internal (contract violation) error
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    /// Check if this is an unsupported-operation error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for ConnectorError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_classified() {
        assert!(ConnectorError::invalid_filter("x").is_invalid_input());
        assert!(ConnectorError::UnknownOperator("$like".into()).is_invalid_input());
        assert!(ConnectorError::invalid_scope("x").is_invalid_input());
        assert!(!ConnectorError::internal("x").is_invalid_input());
        assert!(ConnectorError::Unsupported("execute").is_unsupported());
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            ConnectorError::UnknownOperator("$like".into()).to_string(),
            "Unknown filter operator: $like"
        );
        assert_eq!(
            ConnectorError::decode("age", "bad int").to_string(),
            "Decode error on column 'age': bad int"
        );
    }
}
