//! Error types for cache operations
//!
//! Two layers of errors live here:
//! - [`QueryError`] is what a fetcher reports and what a rejected cache entry
//!   carries. It is cloneable so every subscriber of an entry observes the
//!   same failure.
//! - [`CacheError`] is returned by the fallible public API of the client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a fetcher and stored on a rejected cache entry
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryError {
    /// The request never completed (connection refused, timeout, reset)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The request completed with a non-success status or payload
    #[error("Response error ({status}): {message}")]
    ResponseError { status: u16, message: String },
}

impl QueryError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, QueryError::NetworkError(_))
    }
}

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Arguments could not be keyed, a path could not be resolved,
    /// or cached data could not be decoded into the requested type
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Fetch did not complete
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Fetch completed with a non-success status
    #[error("Response error ({status}): {message}")]
    ResponseError { status: u16, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The client has been shut down
    #[error("Query client has been shut down")]
    ShutdownError,
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<QueryError> for CacheError {
    fn from(error: QueryError) -> Self {
        match error {
            QueryError::NetworkError(message) => CacheError::NetworkError(message),
            QueryError::ResponseError { status, message } => {
                CacheError::ResponseError { status, message }
            }
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        CacheError::SerializationError(error.to_string())
    }
}
