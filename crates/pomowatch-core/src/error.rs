//! Core error types for pomowatch-core.
//!
//! None of these reach the caller of a [`SessionEngine`](crate::SessionEngine)
//! operation: the engine logs and absorbs them. They surface only from the
//! storage and configuration APIs used directly by hosts.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pomowatch-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Persisted snapshot could not be decoded or validated
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Persistence store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Could not resolve or create the data directory
    #[error("Failed to access data directory: {0}")]
    DataDir(#[source] std::io::Error),
}

/// A persisted session record that failed decoding or schema validation.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Not valid JSON, or missing keys / wrong types
    #[error("Malformed session record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Elapsed time is negative or not a finite number
    #[error("Invalid elapsed seconds: {0}")]
    InvalidElapsed(f64),

    /// Record claims to be running but carries no start instant
    #[error("Running session has no start timestamp")]
    MissingStartTimestamp,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
