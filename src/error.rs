//! Error types for proxima.

use thiserror::Error;

/// Errors produced by the on-disk index subsystem.
#[derive(Debug, Error)]
pub enum IndexError {
    /// I/O error from the underlying reader or sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structural violation in an artifact being read (bad magic,
    /// unsupported version, truncation, out-of-range ids).
    #[error("format error: {0}")]
    Format(String),

    /// Write-side contract violation, raised before any output byte.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// Operation not allowed in the current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Operation requires a feature the artifact does not carry.
    #[error("operation not supported: {0}")]
    Unsupported(String),
}

/// Result type alias for proxima operations.
pub type Result<T> = std::result::Result<T, IndexError>;
