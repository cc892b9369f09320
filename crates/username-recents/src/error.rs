//! Error types for username-recents crate.
//!
//! These errors never cross the [`RecentUsernameManager`](crate::RecentUsernameManager)
//! boundary; the manager logs them and degrades to an empty or no-op result.
//! Storage backends and collaborator implementations return them directly.

use thiserror::Error;

/// Errors that can occur while reading or updating recent usernames.
#[derive(Debug, Error)]
pub enum RecentsError {
    /// Storage backend failed a read or write.
    #[error("storage error: {0}")]
    Storage(String),

    /// Storage backend could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// Persisted value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Credential lookup failed.
    #[error("identity source error: {0}")]
    IdentitySource(String),

    /// Account lookup failed.
    #[error("account directory error: {0}")]
    AccountDirectory(String),
}

impl From<serde_json::Error> for RecentsError {
    fn from(err: serde_json::Error) -> Self {
        RecentsError::Serialization(err.to_string())
    }
}

/// Result type for recent-username operations.
pub type Result<T> = std::result::Result<T, RecentsError>;
