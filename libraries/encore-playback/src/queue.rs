//! Queue playback controller
//!
//! Full-length playback through an explicit, order-preserving queue of track
//! ids. The queue is written by the library screen into a session-scoped
//! store as a comma-joined list; the player derives the playable queue from
//! it and auto-advances when a track finishes.

use crate::engine::PreviewEngine;
use crate::error::{PlaybackError, Result};
use crate::events::Subscription;
use crate::sequencer::PreviewTrack;
use crate::types::{PlayRequest, TickInfo, TrackId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// A track counts as finished this close to its end (seconds)
pub const END_TOLERANCE_SEC: f64 = 0.25;

// ===== Queue derivation =====

/// Derive the playable queue
///
/// Splits `raw` on commas, trims, drops empty and unknown ids and keeps the
/// first occurrence of each id. Falls back to `[fallback_id]` when nothing
/// survives.
pub fn derive_queue<T: PreviewTrack>(
    raw: Option<&str>,
    tracks: &[T],
    fallback_id: &str,
) -> Vec<TrackId> {
    let known: HashSet<&str> = tracks.iter().map(|t| t.id()).collect();
    let mut seen = HashSet::new();

    let queue: Vec<TrackId> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty() && known.contains(id))
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect();

    if queue.is_empty() {
        vec![fallback_id.to_string()]
    } else {
        queue
    }
}

/// Dedupe `ids` (first occurrence wins) and join with commas
pub fn encode_queue<S: AsRef<str>>(ids: &[S]) -> String {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| id.as_ref())
        .filter(|id| seen.insert(*id))
        .collect::<Vec<&str>>()
        .join(",")
}

// ===== Queue store =====

/// Session-scoped store for the selected queue
pub trait QueueStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, value: &str);
}

/// In-memory [`QueueStore`]
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    value: Mutex<Option<String>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueueStore for MemoryQueueStore {
    fn load(&self) -> Option<String> {
        self.value.lock().clone()
    }

    fn save(&self, value: &str) {
        *self.value.lock() = Some(value.to_string());
    }
}

/// Persist a library selection for the player
pub fn save_selection<S: AsRef<str>>(store: &dyn QueueStore, ids: &[S]) {
    let encoded = encode_queue(ids);
    debug!(queue = %encoded, "Saving queue selection");
    store.save(&encoded);
}

// ===== Controller =====

type RouteHook = Arc<dyn Fn(&str) + Send + Sync>;

struct QueueState {
    queue: Vec<TrackId>,
    routed: TrackId,
    /// Track id whose end already triggered an advance
    advanced: Option<TrackId>,
}

struct ControllerInner<T> {
    engine: PreviewEngine,
    tracks: HashMap<TrackId, T>,
    state: Mutex<QueueState>,
    on_route: Mutex<Option<RouteHook>>,
    subscription: Mutex<Option<Subscription>>,
}

/// Full playback through the queue with auto-advance
pub struct QueueController<T: PreviewTrack> {
    inner: Arc<ControllerInner<T>>,
}

impl<T: PreviewTrack> Clone for QueueController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: PreviewTrack> QueueController<T> {
    /// Build the controller for the track at `routed_id`
    ///
    /// The queue is derived from `store`; the controller starts listening to
    /// engine ticks immediately.
    pub fn new(
        engine: PreviewEngine,
        tracks: Vec<T>,
        store: &dyn QueueStore,
        routed_id: &str,
    ) -> Self {
        let queue = derive_queue(store.load().as_deref(), &tracks, routed_id);
        debug!(len = queue.len(), routed = routed_id, "Queue derived");

        let tracks = tracks
            .into_iter()
            .map(|t| (t.id().to_string(), t))
            .collect();

        let inner = Arc::new(ControllerInner {
            engine,
            tracks,
            state: Mutex::new(QueueState {
                queue,
                routed: routed_id.to_string(),
                advanced: None,
            }),
            on_route: Mutex::new(None),
            subscription: Mutex::new(None),
        });

        let weak: Weak<ControllerInner<T>> = Arc::downgrade(&inner);
        let subscription = inner.engine.on_tick(move |tick| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_tick(tick);
            }
        });
        *inner.subscription.lock() = Some(subscription);

        Self { inner }
    }

    /// Called with the id whenever the controller routes to a track
    pub fn on_route<F>(&self, hook: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.inner.on_route.lock() = Some(Arc::new(hook));
    }

    pub fn queue(&self) -> Vec<TrackId> {
        self.inner.state.lock().queue.clone()
    }

    pub fn routed_id(&self) -> TrackId {
        self.inner.state.lock().routed.clone()
    }

    /// Position of the routed track in the queue
    pub fn position(&self) -> Option<usize> {
        let state = self.inner.state.lock();
        state.queue.iter().position(|id| *id == state.routed)
    }

    /// Route to `id` and start full playback
    pub async fn play_track(&self, id: &str) -> Result<()> {
        let request = self.inner.route(id)?;
        self.inner.engine.play(request).await
    }

    /// Play the entry after the routed track; no-op at the end of the queue
    pub async fn play_next(&self) -> Result<()> {
        match self.neighbour(1) {
            Some(id) => self.play_track(&id).await,
            None => Ok(()),
        }
    }

    /// Play the entry before the routed track; no-op at the start of the queue
    pub async fn play_previous(&self) -> Result<()> {
        match self.neighbour(-1) {
            Some(id) => self.play_track(&id).await,
            None => Ok(()),
        }
    }

    fn neighbour(&self, offset: isize) -> Option<TrackId> {
        let state = self.inner.state.lock();
        let index = state.queue.iter().position(|id| *id == state.routed)?;
        let target = index.checked_add_signed(offset)?;
        state.queue.get(target).cloned()
    }

    /// Feed a tick directly (normally driven by the engine subscription)
    pub fn handle_tick(&self, tick: &TickInfo) {
        self.inner.handle_tick(tick);
    }
}

impl<T: PreviewTrack> ControllerInner<T> {
    fn route(&self, id: &str) -> Result<PlayRequest> {
        let track = self
            .tracks
            .get(id)
            .ok_or_else(|| PlaybackError::UnknownTrack(id.to_string()))?;
        self.state.lock().routed = id.to_string();

        let hook = self.on_route.lock().clone();
        if let Some(hook) = hook {
            hook(id);
        }
        Ok(PlayRequest::full(track.id(), track.url()))
    }

    fn handle_tick(&self, tick: &TickInfo) {
        let next = {
            let mut state = self.state.lock();
            if tick.id.as_deref() != Some(state.routed.as_str()) {
                state.advanced = None;
                return;
            }
            if !is_finished(tick) {
                state.advanced = None;
                return;
            }
            if state.advanced.as_deref() == Some(state.routed.as_str()) {
                return;
            }
            state.advanced = Some(state.routed.clone());

            let index = state.queue.iter().position(|id| *id == state.routed);
            index.and_then(|i| state.queue.get(i + 1).cloned())
        };

        let Some(next) = next else {
            debug!("Queue finished");
            return;
        };

        info!(next = %next, "Track finished; advancing queue");
        self.engine.pause();
        match self.route(&next) {
            Ok(request) => {
                if let Err(e) = self.engine.cue(request) {
                    warn!(error = %e, "Failed to start next queued track");
                }
            }
            Err(e) => warn!(error = %e, "Queued track disappeared"),
        }
    }
}

/// Paused at (or within the tolerance of) a known positive duration
fn is_finished(tick: &TickInfo) -> bool {
    let Some(duration) = tick.duration.filter(|d| d.is_finite() && *d > 0.0) else {
        return false;
    };
    tick.paused && tick.current_time >= (duration - END_TOLERANCE_SEC).max(0.0)
}
