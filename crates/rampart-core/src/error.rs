//! Error types for Rampart.
//!
//! These are faults, not business outcomes. A player being refused an action
//! is a [`Rejection`](crate::promise::Rejection); an `Error` means storage,
//! configuration or the runtime itself misbehaved.

use thiserror::Error;

/// Result type for Rampart operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Rampart operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// A background task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The node is shutting down and no longer accepts work
    #[error("Node is shutting down")]
    ShuttingDown,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
