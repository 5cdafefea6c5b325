//! Error types for the backup store.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupStoreError {
    /// A create-only write targeted a path that already holds content.
    /// Signals a duplicate backup attempt or duplicate file, not corruption.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A precondition on the manifest's current status was violated.
    #[error("Unexpected manifest state: {0}")]
    UnexpectedManifestState(String),

    /// Any other failure from the backing store. Fatal to the triggering
    /// call; never retried internally.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Manifest could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BackupStoreError>;
