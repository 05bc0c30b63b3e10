//! CLI error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Library error: {0}")]
    Library(String),

    #[error("Playback error: {0}")]
    Playback(#[from] encore_playback::PlaybackError),

    #[error("Decode error: {0}")]
    Decode(#[from] encore_decoder::DecodeError),

    #[error("Spectrum error: {0}")]
    Spectrum(#[from] encore_spectrum::SpectrumError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
