//! Encore - Decoder
//!
//! Symphonia-backed [`MediaSource`](encore_playback::MediaSource)
//! implementations for local files, plus the [`FileLoader`] the engine uses
//! to open them by URL.

pub mod error;
pub mod file;
pub mod loader;
mod resample;

pub use error::{DecodeError, Result};
pub use file::{probe_duration, FileSource};
pub use loader::{file_url, resolve_path, FileLoader};
