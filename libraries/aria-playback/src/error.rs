//! Error types for the playback engine

use std::time::Duration;
use thiserror::Error;

/// Playback errors
///
/// Only the programmer-error variants are ever returned from engine methods.
/// Load and play failures are recorded as `last_error` on the state snapshot.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No track is currently loaded
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Index out of bounds
    #[error("Index out of bounds: {index} (playlist length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Seek target is not a finite number
    #[error("Invalid seek position: {0}")]
    InvalidSeekPosition(f64),

    /// Volume is not a finite number
    #[error("Invalid volume: {0}")]
    InvalidVolume(f64),

    /// Reorder input is not a permutation of the playlist indices
    #[error("Invalid permutation: {0}")]
    InvalidPermutation(String),

    /// Media could not be loaded
    #[error("Failed to load '{track_id}': {reason}")]
    Load { track_id: String, reason: String },

    /// Media did not become ready in time
    #[error("Failed to load '{track_id}': load timed out after {timeout:?}")]
    LoadTimeout { track_id: String, timeout: Duration },

    /// Transport refused to start playback
    #[error("Playback refused: {0}")]
    Play(String),

    /// Durable storage failure
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Errors reported by a [`PlaybackPrimitive`](crate::PlaybackPrimitive)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimitiveError {
    /// Format or codec not supported by the platform
    #[error("unsupported media: {0}")]
    Unsupported(String),

    /// Source could not be reached or opened
    #[error("media unreachable: {0}")]
    Unreachable(String),

    /// Platform policy refused the command (e.g. autoplay blocked)
    #[error("rejected by platform: {0}")]
    Rejected(String),

    /// Any other transport failure
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Durable storage errors
///
/// Never surfaced to `last_error`; the engine logs them and carries on.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
