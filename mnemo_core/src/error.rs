//! Error types for the mnemo_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for mnemo_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected caller input (negative XP, bad display name, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A persistence call failed; the caller decides whether to retry
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The stored progress record moved on since it was read
    #[error("Revision conflict: expected stored revision {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Fold low-level persistence failures into `StorageUnavailable`.
    ///
    /// Conflicts and input errors pass through untouched so callers can
    /// still tell them apart.
    pub fn into_storage(self) -> Self {
        match self {
            Error::Io(e) => Error::StorageUnavailable(e.to_string()),
            Error::Json(e) => Error::StorageUnavailable(e.to_string()),
            Error::Csv(e) => Error::StorageUnavailable(e.to_string()),
            other => other,
        }
    }
}
