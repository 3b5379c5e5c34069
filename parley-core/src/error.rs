//! Error types for the Parley core library.

use thiserror::Error;

/// Top-level error type for all Parley core operations.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// A request field failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error (missing or malformed settings and credentials).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, ParleyError>;
