//! Error types for the sync planner.

use thiserror::Error;

use crate::plan::MessageScope;

/// Errors that can occur while reading stores or parsing planner input.
///
/// This enum is exposed to Swift/Kotlin via UniFFI as a flat error type,
/// meaning the error variants are exposed as simple enum cases with string messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Error))]
#[cfg_attr(feature = "uniffi", uniffi(flat_error))]
pub enum SyncError {
    /// Error serializing/deserializing JSON
    #[error("JSON error: {0}")]
    Json(String),

    /// Local record store query failed
    #[error("database error: {0}")]
    Database(String),

    /// Remote object store access failed
    #[error("remote error: {0}")]
    Remote(String),

    /// Remote path does not exist
    #[error("not found: {path}")]
    NotFound {
        /// Path that was looked up.
        path: String,
    },

    /// Content that cannot be decoded, such as a remote file that is not UTF-8
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl SyncError {
    /// Creates a not-found error for `path`.
    pub fn not_found(path: impl Into<String>) -> Self {
        SyncError::NotFound { path: path.into() }
    }

    /// Returns true if this error means the remote path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
    }

    /// Scope tag used when this error is surfaced as a user-facing message.
    pub fn scope(&self) -> MessageScope {
        match self {
            SyncError::Database(_) => MessageScope::Database,
            _ => MessageScope::Remote,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Json(err.to_string())
    }
}

/// Result type alias for planner operations.
pub type SyncResult<T> = Result<T, SyncError>;
