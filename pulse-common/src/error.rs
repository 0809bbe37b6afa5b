//! Common error types for CampusPulse

use thiserror::Error;

/// Common result type for Pulse operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Pulse services
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O operation error (wraps std::io::Error)
    ///
    /// A failed snapshot write surfaces here with in-memory state already
    /// mutated; memory and disk stay inconsistent until the next
    /// successful mutation.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
