//! Encore command-line host
//!
//! Runs the preview engine without an audio device: output is pulled on a
//! wall-clock or as fast as possible, and events are printed to stdout.
//!
//! - `preview`: continuous previews of a folder
//! - `play`: full playback through a persisted queue
//! - `spectrum`: block-bar frames rendered to PNG

pub mod commands;
pub mod config;
pub mod error;
pub mod library;
pub mod raster;
pub mod report;
pub mod runner;

pub use config::AppConfig;
pub use error::{CliError, Result};
pub use library::{FileQueueStore, FileScanner, Library};
pub use raster::RasterSurface;
pub use report::{Event, Reporter};
pub use runner::{Pace, Pump};
