//! Error handling module for the Study Ledger.
//!
//! This module provides a unified error type using the `thiserror` crate,
//! consolidating all error types from various operations into a single enum.

use std::io;
use thiserror::Error;

/// Unified error type for the Study Ledger service.
///
/// This enum represents all possible errors that can occur in the application,
/// providing automatic conversions from underlying error types.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A required request field was missing or blank
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Teacher-student link absent or inactive
    #[error("Unauthorized access")]
    Unauthorized,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic operation errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

// Helper implementations for common conversions
impl LedgerError {
    /// Create a missing-field validation error
    pub fn missing_field(name: impl Into<String>) -> Self {
        LedgerError::MissingField(name.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        LedgerError::Config(msg.into())
    }

    /// Create a generic other error
    pub fn other(msg: impl Into<String>) -> Self {
        LedgerError::Other(msg.into())
    }

    /// True for errors the caller caused (bad input), not the storage layer
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LedgerError::MissingField(_) | LedgerError::Unauthorized
        )
    }
}

// Allow conversion from string for convenience
impl From<String> for LedgerError {
    fn from(s: String) -> Self {
        LedgerError::Other(s)
    }
}

impl From<&str> for LedgerError {
    fn from(s: &str) -> Self {
        LedgerError::Other(s.to_string())
    }
}
