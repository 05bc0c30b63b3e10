//! Error types for preview playback

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// An operation needed the resource graph before `enable()` built it
    #[error("Playback engine is not enabled")]
    NotEnabled,

    /// The platform refused to start audio output (no user gesture yet)
    #[error("Audio output blocked until a user gesture: {0}")]
    AutoplayBlocked(String),

    /// The output device is unavailable
    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),

    /// Audio source error (unreadable or undecodable media)
    #[error("Audio source error: {0}")]
    AudioSource(String),

    /// Unknown track identifier
    #[error("Unknown track: {0}")]
    UnknownTrack(String),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
