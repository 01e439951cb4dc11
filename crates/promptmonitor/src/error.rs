//! Error types for promptmonitor.
//!
//! This module defines all error types used throughout the promptmonitor crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for promptmonitor operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the state database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Coordinator Errors ===
    /// The coordinator task has stopped and no longer accepts commands.
    #[error("coordinator is not running")]
    CoordinatorUnavailable,

    /// The coordinator answered a message with a reply of the wrong kind.
    #[error("unexpected reply to {request}: got {reply}")]
    UnexpectedReply {
        /// Kind of the request that was sent.
        request: &'static str,
        /// Kind of the reply that came back.
        reply: &'static str,
    },

    /// An identifier was empty after normalization.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    // === Transport Errors ===
    /// The outbound request could not be delivered.
    #[error("transport error: {0}")]
    Transport(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for promptmonitor operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl Error {
    /// Create a new transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error indicates the coordinator is gone.
    #[must_use]
    pub fn is_coordinator_unavailable(&self) -> bool {
        matches!(self, Self::CoordinatorUnavailable)
    }

    /// Check if this error came from the persisted store.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::DatabaseOpen { .. }
                | Self::DatabaseQuery(_)
                | Self::DatabaseMigration { .. }
                | Self::Json(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CoordinatorUnavailable;
        assert_eq!(err.to_string(), "coordinator is not running");

        let err = Error::transport("connection reset");
        assert_eq!(err.to_string(), "transport error: connection reset");
    }

    #[test]
    fn test_is_coordinator_unavailable() {
        assert!(Error::CoordinatorUnavailable.is_coordinator_unavailable());
        assert!(!Error::internal("x").is_coordinator_unavailable());
    }

    #[test]
    fn test_is_storage_error() {
        let err = Error::DatabaseMigration {
            message: "boom".to_string(),
        };
        assert!(err.is_storage_error());
        assert!(!Error::transport("x").is_storage_error());
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_unexpected_reply_display() {
        let err = Error::UnexpectedReply {
            request: "GET_STATE",
            reply: "ACK",
        };
        let msg = err.to_string();
        assert!(msg.contains("GET_STATE"));
        assert!(msg.contains("ACK"));
    }

    #[test]
    fn test_invalid_identifier_display() {
        let err = Error::InvalidIdentifier("  ".to_string());
        assert!(err.to_string().contains("invalid identifier"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
            assert!(err.is_storage_error());
        }
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/state.db",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "sync_interval_secs must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("sync_interval_secs"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
