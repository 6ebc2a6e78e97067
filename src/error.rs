//! Centralized error types for mailscope.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailscope library.
#[derive(Error, Debug)]
pub enum MailscopeError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The local index document file could not be decoded.
    #[error("Invalid index document file '{path}': {reason}")]
    InvalidIndex { path: PathBuf, reason: String },

    /// The label snapshot file could not be decoded.
    #[error("Invalid label snapshot '{path}': {reason}")]
    InvalidLabelSnapshot { path: PathBuf, reason: String },

    /// The label backend answered with a non-success status.
    #[error("Label backend returned {status}: {body}")]
    LabelBackendStatus { status: u16, body: String },

    /// No label backend is configured.
    #[error("No label backend configured")]
    LabelBackendUnavailable,

    /// Transport-level failure talking to the label backend.
    #[error("Label backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A filter token or value could not be understood.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

/// Convenience alias for `Result<T, MailscopeError>`.
pub type Result<T> = std::result::Result<T, MailscopeError>;

impl MailscopeError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
