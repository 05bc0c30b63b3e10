//! Error types for decoding

use encore_playback::PlaybackError;
use thiserror::Error;

/// Decoding errors
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to open file: {0}")]
    Open(#[from] std::io::Error),

    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Failed to probe file: {0}")]
    Probe(String),

    #[error("No audio tracks found")]
    NoTrack,

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Error reading packet: {0}")]
    Read(String),

    #[error("Seek failed: {0}")]
    Seek(String),

    #[error("Resampling error: {0}")]
    Resample(String),
}

impl From<DecodeError> for PlaybackError {
    fn from(e: DecodeError) -> Self {
        PlaybackError::AudioSource(e.to_string())
    }
}

/// Result type for decoding
pub type Result<T> = std::result::Result<T, DecodeError>;
