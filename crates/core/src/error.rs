//! Core Error Types
//!
//! Defines the foundational error types used across the Bug Cascade workspace.
//! These error types are dependency-free (only thiserror + std) to keep the core
//! crate lightweight.
//!
//! Every variant is recoverable by the user: callers surface them as plain
//! agent messages in the conversation log instead of terminating. A denied
//! command is deliberately absent here; it is a normal negative result
//! carried by the command output itself.

use thiserror::Error;

/// Core error type for the Bug Cascade workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A file (or other named resource) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A path resolved outside the configured root
    #[error("Unsafe path (outside root): {0}")]
    UnsafePath(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An approved command did not finish within its timeout
    #[error("Command timed out after {timeout_ms} ms: {command}")]
    Timeout { command: String, timeout_ms: u64 },

    /// The analyzer could not determine a root cause
    #[error("Analysis inconclusive: {0}")]
    AnalysisInconclusive(String),

    /// A permission decision did not match any outstanding request
    #[error("No matching permission request found: {0}")]
    NoMatchingApprovalRequest(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an unsafe path error
    pub fn unsafe_path(msg: impl Into<String>) -> Self {
        Self::UnsafePath(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(command: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            command: command.into(),
            timeout_ms,
        }
    }

    /// Create an inconclusive analysis error
    pub fn analysis_inconclusive(msg: impl Into<String>) -> Self {
        Self::AnalysisInconclusive(msg.into())
    }

    /// Create a no-matching-request error
    pub fn no_matching_request(request_id: impl Into<String>) -> Self {
        Self::NoMatchingApprovalRequest(request_id.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
