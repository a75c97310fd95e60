//! Custom error types for the stop governors.
//!
//! Every governor fails open: errors surface here, get logged by the
//! stop-hook adapter, and the host is allowed to stop. The variants still
//! carry enough structure to tell a recoverable record problem apart from a
//! failed required write.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for governor operations
#[derive(Error, Debug)]
pub enum GovernorError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Required external input was not supplied (ticket id, home, transcript)
    #[error("Missing required input: {what}")]
    MissingInput { what: String },

    // =========================================================================
    // Record Errors
    // =========================================================================
    /// A task record could not be used
    #[error("Invalid task record {path}: {reason}")]
    InvalidTask { path: PathBuf, reason: String },

    /// A refine-loop state header field failed to parse
    #[error("Refine loop: {field} field is invalid (got: '{value}')")]
    InvalidStateField { field: String, value: String },

    /// Task directory could not be listed
    #[error("Failed to read directory: {message}")]
    TaskDirectory { path: PathBuf, message: String },

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// A required write failed; the decision for this invocation is void
    #[error("Failed to persist {path}: {source}")]
    RequiredWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Advisory lock could not be taken
    #[error("Failed to acquire lock {path}: {message}")]
    Lock { path: PathBuf, message: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GovernorError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create a missing-input error
    pub fn missing_input(what: impl Into<String>) -> Self {
        Self::MissingInput { what: what.into() }
    }

    /// Create an invalid state field error
    pub fn invalid_field(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidStateField {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a lock error
    pub fn lock(path: PathBuf, message: impl Into<String>) -> Self {
        Self::Lock {
            path,
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error is recovered locally (record skipped or loop
    /// cleaned up) instead of voiding the invocation
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidTask { .. }
                | Self::InvalidStateField { .. }
                | Self::MissingInput { .. }
                | Self::Config { .. }
        )
    }

    /// Check if this error voids the current invocation's decision
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RequiredWrite { .. } | Self::Lock { .. } | Self::TaskDirectory { .. }
        )
    }
}

/// Type alias for governor results
pub type Result<T> = std::result::Result<T, GovernorError>;
