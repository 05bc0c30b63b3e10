//! Error types for the spectrum renderer

use thiserror::Error;

/// Spectrum rendering errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpectrumError {
    /// A colour string could not be parsed
    #[error("Invalid colour: {0}")]
    InvalidColor(String),
}

/// Result type for spectrum operations
pub type Result<T> = std::result::Result<T, SpectrumError>;
