//! Error types for the entity tables
//!
//! Lookups never fail: a missing entity is `None` or an empty provenance tree.
//! Errors only come out of configuration loading and identifier parsing.

use thiserror::Error;

/// Main error type for table setup and identifier handling
#[derive(Error, Debug)]
pub enum TableError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Identifier could not be parsed
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for table operations
pub type Result<T> = std::result::Result<T, TableError>;

impl From<String> for TableError {
    fn from(s: String) -> Self {
        TableError::Other(s)
    }
}

impl From<&str> for TableError {
    fn from(s: &str) -> Self {
        TableError::Other(s.to_string())
    }
}
