//! Error types for istawatch.
//!
//! Library crates use [`WatchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all istawatch operations.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Browser session error (launch, CDP command, page evaluation).
    #[error("session error: {0}")]
    Session(String),

    /// Network/HTTP error during an artifact transfer.
    #[error("transfer error: {0}")]
    Transfer(String),

    /// A bounded operation exceeded its deadline.
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    /// Metadata store error.
    #[error("store error: {0}")]
    Store(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, WatchError>;

impl WatchError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a timeout error for a named operation.
    pub fn timeout(operation: impl Into<String>, secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            secs,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this failure class is worth retrying (navigation/transfer
    /// timeouts and network hiccups). Structural and integrity failures
    /// are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WatchError::Transfer(_) | WatchError::Timeout { .. } | WatchError::Session(_)
        )
    }
}
