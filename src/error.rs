//! Error types for the sync layer.

use crate::types::ReservationId;
use thiserror::Error;

/// Main error type for sync-layer operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Push channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("Backend request failed: {0}")]
    Backend(String),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

/// Result type for sync-layer operations.
pub type Result<T> = std::result::Result<T, SyncError>;
