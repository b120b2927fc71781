use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded: {needed} bytes needed, {limit} available")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to parse stored state for '{key}': {message}")]
    Parse { key: String, message: String },

    #[error("failed to migrate stored state for '{key}': {message}")]
    Migration { key: String, message: String },

    #[error("stored state for '{key}' failed validation: {message}")]
    Validation { key: String, message: String },

    #[error("failed to serialize state for '{key}': {message}")]
    Serialization { key: String, message: String },

    #[error("storage error for '{key}': {source}")]
    Storage {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("infinite save loop detected for '{key}'; saves paused for {}ms", retry_after.as_millis())]
    InfiniteLoopDetected { key: String, retry_after: Duration },
}

impl PersistenceError {
    pub fn kind(&self) -> &'static str {
        match self {
            PersistenceError::Parse { .. } => "parse_error",
            PersistenceError::Migration { .. } => "migration_error",
            PersistenceError::Validation { .. } => "validation_error",
            PersistenceError::Serialization { .. } => "serialization_error",
            PersistenceError::Storage { .. } => "storage_error",
            PersistenceError::InfiniteLoopDetected { .. } => "infinite_loop_detected",
        }
    }

    pub fn key(&self) -> &str {
        match self {
            PersistenceError::Parse { key, .. }
            | PersistenceError::Migration { key, .. }
            | PersistenceError::Validation { key, .. }
            | PersistenceError::Serialization { key, .. }
            | PersistenceError::Storage { key, .. }
            | PersistenceError::InfiniteLoopDetected { key, .. } => key,
        }
    }
}
