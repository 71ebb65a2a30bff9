//! Error types for the Rolo contacts API

use thiserror::Error;

/// Result type alias for Rolo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Rolo service
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Authentication/authorization error
    #[error("auth error: {0}")]
    Auth(String),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness conflict (duplicate email, phone, or username)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller supplied an invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Outbound mail error
    #[error("mail error: {0}")]
    Mail(String),
}
