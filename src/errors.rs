// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunwaiterError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Snapshot encoding error: {0}")]
    SnapshotError(#[from] serde_json::Error),

    #[error("Runs are locked; no new runs can be scheduled")]
    Locked,

    #[error("Custom run payload is not whitelisted: {0}")]
    PayloadNotAllowed(String),

    #[error("Shutting down; no new runs are accepted")]
    ShuttingDown,

    #[error("Dispatcher queue closed")]
    QueueClosed,

    #[error("No log for job {0}")]
    LogNotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RunwaiterError>;
