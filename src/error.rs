//! Error types for Call Tracker

use thiserror::Error;

/// Errors raised by a persistence backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while tracking call sessions
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Call ID must not be empty")]
    EmptyId,

    #[error("A call is already in progress")]
    SessionAlreadyActive,

    #[error("No call is in progress")]
    NoActiveSession,

    #[error("Unknown behavior: {0}")]
    UnknownBehavior(String),

    #[error("There is no call history to export")]
    NoHistory,

    #[error("Invalid behavior catalog: {0}")]
    InvalidCatalog(String),

    #[error("Failed to load daily data: {0}")]
    PersistenceLoad(#[source] StoreError),

    #[error("Failed to save daily data: {0}")]
    PersistenceSave(#[source] StoreError),

    #[error("Failed to clear daily data: {0}")]
    PersistenceClear(#[source] StoreError),

    #[error("Persistence worker has stopped")]
    PersistenceClosed,
}

impl TrackerError {
    /// Whether this error came from the storage boundary rather than caller input
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            TrackerError::PersistenceLoad(_)
                | TrackerError::PersistenceSave(_)
                | TrackerError::PersistenceClear(_)
                | TrackerError::PersistenceClosed
        )
    }
}
