//! Error types for cfgmgr store operations.
//!
//! All errors implement `std::error::Error` via `thiserror`.

use thiserror::Error;

/// Result type alias for cfgmgr operations.
pub type CfgMgrResult<T> = Result<T, CfgMgrError>;

/// Errors that can occur while talking to the configuration store.
#[derive(Debug, Error)]
pub enum CfgMgrError {
    /// Redis/database operation failed.
    #[error("Database operation failed: {operation}: {message}")]
    Database {
        /// The operation that failed (e.g., "hgetall", "hset", "del").
        operation: String,
        /// Error message.
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },
}

impl CfgMgrError {
    /// Creates a database error.
    pub fn database(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Database {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for CfgMgrError {
    fn from(err: redis::RedisError) -> Self {
        let operation = err.code().unwrap_or("redis").to_string();
        Self::database(operation, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error() {
        let err = CfgMgrError::database("hgetall", "Connection refused");
        assert_eq!(
            err.to_string(),
            "Database operation failed: hgetall: Connection refused"
        );
    }

    #[test]
    fn test_invalid_config_error() {
        let err = CfgMgrError::invalid_config("daemon.timeout_ms", "must be non-zero");
        assert!(err.to_string().contains("daemon.timeout_ms"));
        assert!(err.to_string().contains("must be non-zero"));
    }
}
