//! Continuous preview sequencer
//!
//! Walks a track list playing each track's preview window back to back. The
//! engine's terminal notifications drive the advance; tracks whose window is
//! degenerate are skipped without being played.

use crate::config::SequencerConfig;
use crate::engine::PreviewEngine;
use crate::error::{PlaybackError, Result};
use crate::events::Subscription;
use crate::types::{PlayRequest, PreviewEndInfo, PreviewWindow, Track, TrackId};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Read access to the fields the sequencer and queue controller need
///
/// Implemented for [`Track`]; library types can implement it directly.
pub trait PreviewTrack: Send + Sync + 'static {
    fn id(&self) -> &str;
    fn url(&self) -> &str;
    fn preview_start(&self) -> Option<f64>;
    fn preview_end(&self) -> Option<f64>;
    fn duration(&self) -> Option<f64>;
}

impl PreviewTrack for Track {
    fn id(&self) -> &str {
        &self.id
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn preview_start(&self) -> Option<f64> {
        self.preview_start_sec
    }

    fn preview_end(&self) -> Option<f64> {
        self.preview_end_sec
    }

    fn duration(&self) -> Option<f64> {
        self.duration_sec
    }
}

/// Preview window the sequencer would play for `track`
///
/// Missing start defaults to 0; missing end defaults to
/// `min(default_window, duration)`. Returns `None` for degenerate windows.
pub fn resolve_window<T: PreviewTrack + ?Sized>(
    track: &T,
    config: &SequencerConfig,
) -> Option<PreviewWindow> {
    let start = track.preview_start().unwrap_or(0.0);
    let end = track.preview_end().unwrap_or_else(|| {
        let window = config.default_window_sec;
        track
            .duration()
            .filter(|d| d.is_finite() && *d > 0.0)
            .map_or(window, |d| d.min(window))
    });
    PreviewWindow::new(start, end).filter(|w| !w.is_degenerate())
}

type TrackChangeHook = Arc<dyn Fn(usize, &str) + Send + Sync>;

struct SequencerState<T> {
    tracks: Arc<[T]>,
    running: bool,
    current_index: Option<usize>,
    current_id: Option<TrackId>,
}

impl<T> SequencerState<T> {
    fn clear(&mut self) {
        self.running = false;
        self.current_index = None;
        self.current_id = None;
    }
}

struct SequencerInner<T> {
    engine: PreviewEngine,
    config: SequencerConfig,
    state: Mutex<SequencerState<T>>,
    on_track_change: Mutex<Option<TrackChangeHook>>,
    subscription: Mutex<Option<Subscription>>,
}

/// Continuous preview over an ordered track list
///
/// Cloning shares the same sequencer. The preview-end subscription is held
/// weakly, so dropping the last clone detaches it from the engine.
pub struct ContinuousPreview<T: PreviewTrack> {
    inner: Arc<SequencerInner<T>>,
}

impl<T: PreviewTrack> Clone for ContinuousPreview<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: PreviewTrack> ContinuousPreview<T> {
    pub fn new(engine: PreviewEngine, tracks: Vec<T>) -> Self {
        Self::with_config(engine, tracks, SequencerConfig::default())
    }

    pub fn with_config(engine: PreviewEngine, tracks: Vec<T>, config: SequencerConfig) -> Self {
        let inner = Arc::new(SequencerInner {
            engine,
            config,
            state: Mutex::new(SequencerState {
                tracks: tracks.into(),
                running: false,
                current_index: None,
                current_id: None,
            }),
            on_track_change: Mutex::new(None),
            subscription: Mutex::new(None),
        });

        let weak: Weak<SequencerInner<T>> = Arc::downgrade(&inner);
        let subscription = inner.engine.on_preview_end(move |info| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_preview_end(info);
            }
        });
        *inner.subscription.lock() = Some(subscription);

        Self { inner }
    }

    /// Replace the track list
    ///
    /// A running sequence keeps playing; it continues from the position of
    /// the current id in the new list, or stops at the next boundary if the
    /// id is gone.
    pub fn set_tracks(&self, tracks: Vec<T>) {
        let mut state = self.inner.state.lock();
        state.tracks = tracks.into();
        let index = state
            .current_id
            .as_deref()
            .and_then(|id| state.tracks.iter().position(|t| t.id() == id));
        state.current_index = index;
    }

    /// Called with `(index, id)` whenever a new preview starts
    pub fn on_track_change<F>(&self, hook: F)
    where
        F: Fn(usize, &str) + Send + Sync + 'static,
    {
        *self.inner.on_track_change.lock() = Some(Arc::new(hook));
    }

    pub fn running(&self) -> bool {
        self.inner.state.lock().running
    }

    pub fn current_index(&self) -> Option<usize> {
        self.inner.state.lock().current_index
    }

    pub fn current_id(&self) -> Option<TrackId> {
        self.inner.state.lock().current_id.clone()
    }

    /// Start previewing at `index`, skipping degenerate windows
    ///
    /// Resolves `Ok(())` with `running() == false` if nothing from `index`
    /// onward is playable.
    pub async fn start_from_index(&self, index: usize) -> Result<()> {
        let next = {
            let mut state = self.inner.state.lock();
            state.running = true;
            let next = self.inner.next_playable(&state.tracks, index);
            self.inner.select(&mut state, next.as_ref());
            next
        };

        let Some((index, request)) = next else {
            info!(from = index, "No playable previews; continuous preview idle");
            return Ok(());
        };

        info!(index, track = %request.id, "Continuous preview started");
        self.inner.notify_track_change(index, &request.id);
        if let Err(e) = self.inner.engine.play(request).await {
            self.inner.state.lock().clear();
            return Err(e);
        }
        Ok(())
    }

    /// Start previewing at the track with `id`
    pub async fn start_from_id(&self, id: &str) -> Result<()> {
        let index = {
            let state = self.inner.state.lock();
            state.tracks.iter().position(|t| t.id() == id)
        };
        match index {
            Some(index) => self.start_from_index(index).await,
            None => Err(PlaybackError::UnknownTrack(id.to_string())),
        }
    }

    /// Stop the sequence and fade the engine out
    pub fn stop_continuous(&self) {
        self.inner.state.lock().clear();
        self.inner.engine.stop();
        info!("Continuous preview stopped");
    }
}

impl<T: PreviewTrack> SequencerInner<T> {
    /// First playable track at or after `from`
    fn next_playable(&self, tracks: &[T], from: usize) -> Option<(usize, PlayRequest)> {
        tracks
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(index, track)| match resolve_window(track, &self.config) {
                Some(window) => Some((
                    index,
                    PlayRequest::preview(track.id(), track.url(), window.start, window.end),
                )),
                None => {
                    debug!(index, track = track.id(), "Skipping degenerate preview window");
                    None
                }
            })
    }

    fn select(&self, state: &mut SequencerState<T>, next: Option<&(usize, PlayRequest)>) {
        match next {
            Some((index, request)) => {
                state.current_index = Some(*index);
                state.current_id = Some(request.id.clone());
            }
            None => state.clear(),
        }
    }

    fn notify_track_change(&self, index: usize, id: &str) {
        let hook = self.on_track_change.lock().clone();
        if let Some(hook) = hook {
            hook(index, id);
        }
    }

    fn handle_preview_end(&self, info: &PreviewEndInfo) {
        let next = {
            let mut state = self.state.lock();
            if !state.running || state.current_id.as_deref() != Some(info.id.as_str()) {
                return;
            }
            let Some(current) = state.current_index else {
                state.clear();
                return;
            };
            let next = self.next_playable(&state.tracks, current + 1);
            self.select(&mut state, next.as_ref());
            next
        };

        let Some((index, request)) = next else {
            info!(last = %info.id, "Continuous preview reached end of list");
            return;
        };

        debug!(index, track = %request.id, reason = ?info.reason, "Advancing preview");
        self.notify_track_change(index, &request.id);
        if let Err(e) = self.engine.cue(request) {
            warn!(error = %e, "Failed to advance preview; stopping");
            self.state.lock().clear();
        }
    }
}
