//! Database Error Types
//!
//! This module defines error types for storage operations, providing
//! clear error handling for connection, initialization, query and
//! transaction failures.

use std::path::PathBuf;
use thiserror::Error;

/// Storage operation errors
///
/// Covers every failure a `TreeStore` backend can report. Relocation-level
/// failures (invalid placement, integrity violations) are handled by the
/// service-layer `RelocationError`.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to initialize database schema
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Invalid database path provided
    #[error("Invalid database path: {path}")]
    InvalidPath { path: PathBuf },

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// Transaction could not be started, committed or rolled back
    #[error("Transaction failed: {context}")]
    TransactionFailed { context: String },

    /// Seed data rejected before it reached storage
    #[error("Invalid seed data: {0}")]
    InvalidSeed(String),
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create an invalid path error
    pub fn invalid_path(path: PathBuf) -> Self {
        Self::InvalidPath { path }
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// Create a transaction failed error
    pub fn transaction_failed(context: impl Into<String>) -> Self {
        Self::TransactionFailed {
            context: context.into(),
        }
    }

    /// Create an invalid seed error
    pub fn invalid_seed(msg: impl Into<String>) -> Self {
        Self::InvalidSeed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_execution_error_message() {
        let err = DatabaseError::sql_execution("Failed to shift range: disk I/O error");
        assert!(matches!(err, DatabaseError::SqlExecutionError { .. }));
        assert_eq!(
            format!("{}", err),
            "SQL execution failed: Failed to shift range: disk I/O error"
        );
    }

    #[test]
    fn test_transaction_failed_error_message() {
        let err = DatabaseError::transaction_failed("Failed to commit: database is locked");
        assert_eq!(
            format!("{}", err),
            "Transaction failed: Failed to commit: database is locked"
        );
    }

    #[test]
    fn test_invalid_path_error_message() {
        let err = DatabaseError::invalid_path(PathBuf::from("/dev/null/tree.db"));
        assert_eq!(format!("{}", err), "Invalid database path: /dev/null/tree.db");
    }
}
