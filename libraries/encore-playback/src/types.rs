//! Core types for preview playback

use serde::{Deserialize, Serialize};

/// Stable track identifier
pub type TrackId = String;

/// Shortest preview window (seconds) that is still worth playing
pub const MIN_PREVIEW_WINDOW_SEC: f64 = 0.2;

/// Track descriptor supplied by the library
///
/// Owned by the caller; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique identifier
    pub id: TrackId,

    /// Resolvable audio source (file URL or path)
    pub url: String,

    /// Preview window start offset (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_start_sec: Option<f64>,

    /// Preview window end offset (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_end_sec: Option<f64>,

    /// Total duration if known (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
}

impl Track {
    /// Create a track without preview bounds or duration
    pub fn new(id: impl Into<TrackId>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            preview_start_sec: None,
            preview_end_sec: None,
            duration_sec: None,
        }
    }

    /// Set preview bounds
    #[must_use]
    pub fn with_preview(mut self, start_sec: f64, end_sec: f64) -> Self {
        self.preview_start_sec = Some(start_sec);
        self.preview_end_sec = Some(end_sec);
        self
    }

    /// Set duration
    #[must_use]
    pub fn with_duration(mut self, duration_sec: f64) -> Self {
        self.duration_sec = Some(duration_sec);
        self
    }

    /// Full-length playback request for this track
    pub fn full_request(&self) -> PlayRequest {
        PlayRequest::full(self.id.clone(), self.url.clone())
    }
}

/// A bounded `[start, end)` sub-range of a track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewWindow {
    pub start: f64,
    pub end: f64,
}

impl PreviewWindow {
    /// Build a window, rejecting non-finite or inverted bounds
    ///
    /// Negative starts are clamped to 0 before the check.
    pub fn new(start: f64, end: f64) -> Option<Self> {
        if !start.is_finite() || !end.is_finite() {
            return None;
        }
        let start = start.max(0.0);
        (end > start).then_some(Self { start, end })
    }

    /// Window from optional bounds (both must be present)
    pub fn from_bounds(start: Option<f64>, end: Option<f64>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => None,
        }
    }

    /// Window length in seconds
    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    /// Degenerate windows are skipped by the sequencer
    pub fn is_degenerate(&self) -> bool {
        self.len() < MIN_PREVIEW_WINDOW_SEC
    }
}

/// Request accepted by `PreviewEngine::play`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayRequest {
    pub id: TrackId,
    pub url: String,
    #[serde(default)]
    pub preview_start: Option<f64>,
    #[serde(default)]
    pub preview_end: Option<f64>,
}

impl PlayRequest {
    /// Full playback from the beginning
    pub fn full(id: impl Into<TrackId>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            preview_start: None,
            preview_end: None,
        }
    }

    /// Bounded preview
    pub fn preview(id: impl Into<TrackId>, url: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            preview_start: Some(start),
            preview_end: Some(end),
        }
    }

    /// Valid preview window, or `None` for full playback
    pub fn window(&self) -> Option<PreviewWindow> {
        PreviewWindow::from_bounds(self.preview_start, self.preview_end)
    }
}

/// Buffered media range (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

/// Media state snapshot emitted on every observable change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickInfo {
    pub id: Option<TrackId>,
    pub current_time: f64,
    pub duration: Option<f64>,
    pub paused: bool,
    pub buffered: Vec<TimeRange>,
}

impl Default for TickInfo {
    fn default() -> Self {
        Self {
            id: None,
            current_time: 0.0,
            duration: None,
            paused: true,
            buffered: Vec::new(),
        }
    }
}

/// Why a playback session terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    /// The active preview window was reached
    PreviewEnd,
    /// The source played to its natural end
    Ended,
}

/// One-shot terminal notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewEndInfo {
    pub id: TrackId,
    pub reason: EndReason,
}
