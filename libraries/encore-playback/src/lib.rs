//! Encore - Preview Playback
//!
//! One shared audio pipeline for browsing and playing a local library.
//!
//! This crate provides:
//! - A playback engine with seamless source switching and linear gain fades
//! - Preview-window truncation with one-shot terminal notifications
//! - State ticks for UI binding
//! - A pre-gain frequency analysis tap for visualizers
//! - A continuous preview sequencer that walks a track list
//! - A queue controller that auto-advances full playback
//!
//! # Architecture
//!
//! `encore-playback` has no device or decoder dependency. Platform pieces
//! are provided through traits:
//! - [`OutputContext`]: sample rate, suspended/running state, autoplay gate
//! - [`SourceLoader`] / [`MediaSource`]: decoded audio for a track URL
//!
//! The host pulls audio with [`PreviewEngine::render`], which also drives
//! every timed behaviour (fades, preview boundaries, ticks).
//!
//! # Example: Continuous Preview
//!
//! ```rust,no_run
//! use encore_playback::{ContinuousPreview, HeadlessOutput, PreviewEngine, Track};
//! use std::sync::Arc;
//!
//! # async fn demo(loader: Arc<dyn encore_playback::SourceLoader>) -> encore_playback::Result<()> {
//! let engine = PreviewEngine::new(Arc::new(HeadlessOutput::new(48000)), loader);
//!
//! let tracks = vec![
//!     Track::new("1", "file:///music/one.flac").with_preview(45.0, 75.0),
//!     Track::new("2", "file:///music/two.flac").with_duration(20.0),
//! ];
//! let sequencer = ContinuousPreview::new(engine.clone(), tracks);
//! sequencer.start_from_index(0).await?;
//!
//! // Device callback
//! let mut buffer = vec![0.0f32; 2 * 1024];
//! engine.render(&mut buffer);
//! # Ok(())
//! # }
//! ```

pub mod analyser;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod gain;
pub mod graph;
pub mod output;
pub mod queue;
pub mod sequencer;
pub mod source;
pub mod types;

pub use analyser::Analyser;
pub use config::{EngineConfig, SequencerConfig};
pub use engine::PreviewEngine;
pub use error::{PlaybackError, Result};
pub use events::{Listeners, Subscription};
pub use gain::GainSchedule;
pub use graph::GraphStats;
pub use output::{HeadlessOutput, OutputContext, OutputState};
pub use queue::{
    derive_queue, encode_queue, save_selection, MemoryQueueStore, QueueController, QueueStore,
};
pub use sequencer::{resolve_window, ContinuousPreview, PreviewTrack};
pub use source::{MediaSource, SourceLoader};
pub use types::{
    EndReason, PlayRequest, PreviewEndInfo, PreviewWindow, TickInfo, TimeRange, Track, TrackId,
};
