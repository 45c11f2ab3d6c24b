//! Error types for Statica

use thiserror::Error;

/// Result type for Statica operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Statica
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),

    /// Route pattern error
    #[error("Invalid route pattern '{pattern}': {reason}")]
    Route { pattern: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
