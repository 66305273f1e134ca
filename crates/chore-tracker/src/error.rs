//! Error types for chore-tracker.
//!
//! This module defines all error types used throughout the chore-tracker crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::chore::ChoreState;

/// The main error type for chore-tracker operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to read the chore store from disk.
    #[error("failed to read chore store at {path}: {source}")]
    StorageRead {
        /// Path to the store file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the chore store to disk.
    #[error("failed to write chore store at {path}: {source}")]
    StorageWrite {
        /// Path to the store file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The on-disk format could not be migrated.
    #[error("storage migration failed: {message}")]
    StorageMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A backup could not be created or restored.
    #[error("backup error: {message}")]
    Backup {
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

    // === Chore Errors ===
    /// No chore matched the given id or name.
    #[error("chore not found: {key}")]
    ChoreNotFound {
        /// The id or name that was looked up.
        key: String,
    },

    /// A chore with the same id or name already exists.
    #[error("chore already exists: {key}")]
    DuplicateChore {
        /// The conflicting id or name.
        key: String,
    },

    /// The requested state change is not allowed.
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: ChoreState,
        /// Requested state.
        to: ChoreState,
    },

    /// A request field failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the validation failure.
        message: String,
    },

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

/// A specialized Result type for chore-tracker operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new validation error for the given field.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a new backup error.
    #[must_use]
    pub fn backup(message: impl Into<String>) -> Self {
        Self::Backup {
            message: message.into(),
        }
    }

    /// Create a chore-not-found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::ChoreNotFound { key: key.into() }
    }

    /// Check if this error indicates a missing chore.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ChoreNotFound { .. })
    }

    /// Check if this error was caused by bad user input rather than the
    /// environment.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::DuplicateChore { .. }
                | Self::InvalidTransition { .. }
                | Self::ChoreNotFound { .. }
        )
    }
}
