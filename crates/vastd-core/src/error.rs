//! Error types for vastd-core

use thiserror::Error;

/// Result type alias for vastd operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the vastd service
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid HTTP method
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// Configuration rejected at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// XML serialization error
    #[error("XML error: {0}")]
    Xml(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Response could not be converted for hyper
    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),
}
