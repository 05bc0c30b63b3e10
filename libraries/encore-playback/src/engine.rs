//! Preview playback engine
//!
//! `PreviewEngine` is the only component that mutates the resource graph.
//! It layers play/pause/seek/stop on top of one media element, schedules
//! gain fades, truncates playback at preview boundaries and publishes two
//! event streams: state ticks and one-shot terminal notifications.
//!
//! # Clock
//!
//! All timing is driven by [`PreviewEngine::render`]. Each call advances the
//! output clock in fixed render quanta; fades, deferred pauses and
//! preview-boundary detection are evaluated per quantum, so their
//! granularity does not depend on the caller's buffer size.
//!
//! # Re-entrancy
//!
//! Events are collected while the state lock is held and dispatched after it
//! is released, so listeners may call back into the engine. Listeners that
//! run inside a render pass should use the synchronous [`PreviewEngine::cue`].

use crate::analyser::Analyser;
use crate::config::EngineConfig;
use crate::error::{PlaybackError, Result};
use crate::events::{Listeners, Subscription};
use crate::graph::{GraphStats, Rebind, ResourceGraph};
use crate::output::{OutputContext, OutputState};
use crate::source::{MediaSource, SourceLoader};
use crate::types::{EndReason, PlayRequest, PreviewEndInfo, TickInfo, TimeRange, TrackId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// ===== Internal state =====

/// Which track (and bound) arms the next terminal notification
#[derive(Debug, Clone, PartialEq)]
struct TerminalTarget {
    id: TrackId,
    preview_end: Option<f64>,
}

enum EngineEvent {
    Tick(TickInfo),
    End(PreviewEndInfo),
}

/// The one media element
struct MediaElement {
    url: Option<String>,
    source: Option<Box<dyn MediaSource>>,
    paused: bool,
    ended: bool,
    current_time: f64,
    duration: Option<f64>,
    buffered: Vec<TimeRange>,
    /// Reads never advance past this media time (preview boundary pin)
    limit: Option<f64>,
    last_tick_time: f64,
}

impl MediaElement {
    fn empty() -> Self {
        Self {
            url: None,
            source: None,
            paused: true,
            ended: false,
            current_time: 0.0,
            duration: None,
            buffered: Vec::new(),
            limit: None,
            last_tick_time: 0.0,
        }
    }

    fn load(&mut self, url: String, source: Box<dyn MediaSource>) {
        self.duration = source.duration().map(|d| d.as_secs_f64());
        self.current_time = source.position().as_secs_f64();
        self.buffered = source.buffered();
        self.url = Some(url);
        self.source = Some(source);
        self.paused = true;
        self.ended = false;
        self.limit = None;
    }

    fn unload(&mut self) {
        *self = Self::empty();
    }

    fn is_playing(&self) -> bool {
        !self.paused && !self.ended && self.source.is_some()
    }

    fn seek(&mut self, seconds: f64) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        let mut target = seconds.max(0.0);
        if let Some(duration) = self.duration {
            target = target.min(duration);
        }
        let Ok(position) = Duration::try_from_secs_f64(target) else {
            warn!(seconds = target, "Seek target out of range");
            return;
        };
        match source.seek(position) {
            Ok(()) => {
                self.current_time = source.position().as_secs_f64();
                self.buffered = source.buffered();
                self.ended = false;
            }
            Err(e) => warn!(seconds = target, error = %e, "Seek failed"),
        }
    }

    /// Frames that may be read before hitting the pin
    fn frames_until_limit(&self, sample_rate: u32, frames: usize) -> usize {
        match self.limit {
            Some(limit) => {
                let remaining = ((limit - self.current_time) * f64::from(sample_rate)).floor();
                if remaining <= 0.0 {
                    0
                } else {
                    (remaining as usize).min(frames)
                }
            }
            None => frames,
        }
    }
}

struct EngineState {
    graph: Option<ResourceGraph>,
    media: MediaElement,
    current_id: Option<TrackId>,
    target: Option<TerminalTarget>,
    /// Output clock (seconds)
    clock: f64,
    /// Output time at which a scheduled pause executes
    pending_pause: Option<f64>,
    events: Vec<EngineEvent>,
}

impl EngineState {
    fn snapshot(&self) -> TickInfo {
        TickInfo {
            id: self.current_id.clone(),
            current_time: self.media.current_time,
            duration: self.media.duration,
            paused: self.media.paused,
            buffered: self.media.buffered.clone(),
        }
    }

    fn push_tick(&mut self) {
        self.media.last_tick_time = self.media.current_time;
        let tick = self.snapshot();
        self.events.push(EngineEvent::Tick(tick));
    }

    fn push_end(&mut self, id: TrackId, reason: EndReason) {
        self.events.push(EngineEvent::End(PreviewEndInfo { id, reason }));
    }

    fn set_paused(&mut self) {
        if !self.media.paused {
            self.media.paused = true;
            self.push_tick();
        }
    }
}

struct EngineInner {
    config: EngineConfig,
    output: Arc<dyn OutputContext>,
    loader: Arc<dyn SourceLoader>,
    state: Mutex<EngineState>,
    /// Bumped by every play/cue; the newest request wins
    generation: AtomicU64,
    enabling: tokio::sync::Mutex<()>,
    ticks: Listeners<TickInfo>,
    preview_ends: Listeners<PreviewEndInfo>,
}

// ===== Public handle =====

/// Shared playback engine
///
/// Construct once and pass clones to every consumer; all clones drive the
/// same resource graph.
///
/// # Example
///
/// ```rust,no_run
/// use encore_playback::{HeadlessOutput, PlayRequest, PreviewEngine, Result};
/// use std::sync::Arc;
///
/// # async fn demo(loader: Arc<dyn encore_playback::SourceLoader>) -> Result<()> {
/// let engine = PreviewEngine::new(Arc::new(HeadlessOutput::new(48000)), loader);
/// engine.enable().await?;
///
/// let _ticks = engine.on_tick(|tick| println!("{:.2}s", tick.current_time));
/// engine
///     .play(PlayRequest::preview("t1", "file:///music/a.flac", 45.0, 75.0))
///     .await?;
///
/// let mut buffer = vec![0.0f32; 2 * 512];
/// engine.render(&mut buffer);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PreviewEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for PreviewEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewEngine")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PreviewEngine {
    /// Create an engine with default timings
    pub fn new(output: Arc<dyn OutputContext>, loader: Arc<dyn SourceLoader>) -> Self {
        Self::with_config(EngineConfig::default(), output, loader)
    }

    pub fn with_config(
        config: EngineConfig,
        output: Arc<dyn OutputContext>,
        loader: Arc<dyn SourceLoader>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                output,
                loader,
                state: Mutex::new(EngineState {
                    graph: None,
                    media: MediaElement::empty(),
                    current_id: None,
                    target: None,
                    clock: 0.0,
                    pending_pause: None,
                    events: Vec::new(),
                }),
                generation: AtomicU64::new(0),
                enabling: tokio::sync::Mutex::new(()),
                ticks: Listeners::new("tick"),
                preview_ends: Listeners::new("preview-end"),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // ===== Lifecycle =====

    /// Build the resource graph (once) and start the output
    ///
    /// Safe to call any number of times, concurrently or not. Rewires the
    /// source if the output session changed since the last call.
    pub async fn enable(&self) -> Result<()> {
        let _guard = self.inner.enabling.lock().await;
        self.with_state(|state| self.ensure_graph(state));

        if self.inner.output.state() == OutputState::Suspended {
            if let Err(e) = self.inner.output.resume().await {
                warn!(error = %e, "Output refused to start");
                return Err(e);
            }
            // Resuming may have started a new device session
            self.with_state(|state| self.ensure_graph(state));
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.state.lock().graph.is_some()
    }

    /// Analysis tap, `None` before the first `enable()`
    pub fn analyser(&self) -> Option<Analyser> {
        self.inner
            .state
            .lock()
            .graph
            .as_ref()
            .map(|graph| graph.analyser().clone())
    }

    pub fn stats(&self) -> GraphStats {
        self.inner
            .state
            .lock()
            .graph
            .as_ref()
            .map(ResourceGraph::stats)
            .unwrap_or_default()
    }

    // ===== Transport =====

    /// Enable, then start `request`
    ///
    /// Switching to a different URL cuts the gain to silence at once rather
    /// than fading the old source out; the new source then fades in from 0.
    /// Replaying the loaded URL fades in from the current gain.
    ///
    /// A newer `play` or `cue` issued while this call waits on `enable()`
    /// supersedes it; the superseded call resolves `Ok(())` without effect.
    /// Unloadable sources are logged and leave the engine paused.
    pub async fn play(&self, request: PlayRequest) -> Result<()> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.enable().await?;

        self.with_state(|state| {
            if self.inner.generation.load(Ordering::SeqCst) != generation {
                debug!(track = %request.id, "Play request superseded");
                return Ok(());
            }
            self.cue_locked(state, request)
        })
    }

    /// Start `request` on an already enabled engine without awaiting
    ///
    /// Used from listener callbacks, which run synchronously.
    pub fn cue(&self, request: PlayRequest) -> Result<()> {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.with_state(|state| self.cue_locked(state, request))
    }

    /// Pause immediately, without a fade
    pub fn pause(&self) {
        self.with_state(|state| {
            state.pending_pause = None;
            state.set_paused();
        });
    }

    /// Resume the loaded source; the gain schedule is left untouched
    pub async fn resume(&self) -> Result<()> {
        self.enable().await?;
        self.with_state(|state| {
            if state.media.source.is_none() {
                return;
            }
            if state.media.ended {
                state.media.seek(0.0);
            }
            // Keep the pin while a preview end is still armed
            state.media.limit = state.target.as_ref().and_then(|t| t.preview_end);
            state.pending_pause = None;
            if state.media.paused {
                state.media.paused = false;
                state.push_tick();
            }
        });
        Ok(())
    }

    /// Resume if paused, otherwise pause
    pub async fn toggle(&self) -> Result<()> {
        let paused = self.inner.state.lock().media.paused;
        if paused {
            self.resume().await
        } else {
            self.pause();
            Ok(())
        }
    }

    /// Seek within `[0, min(duration, active preview end)]`
    pub fn seek(&self, seconds: f64) {
        self.with_state(|state| {
            if state.media.source.is_none() || !seconds.is_finite() {
                return;
            }
            let preview_end = state.target.as_ref().and_then(|t| t.preview_end);
            let upper = match (state.media.duration, preview_end) {
                (Some(duration), Some(end)) => duration.min(end),
                (Some(duration), None) => duration,
                (None, Some(end)) => end,
                (None, None) => f64::INFINITY,
            };
            state.media.seek(seconds.clamp(0.0, upper));
            state.push_tick();
        });
    }

    /// Fade out, then pause; disarms the terminal notification
    pub fn stop(&self) {
        let fade = self.inner.config.fade_out_sec();
        let running = self.inner.output.state() == OutputState::Running;
        self.with_state(|state| {
            state.target = None;
            let now = state.clock;
            let faded = match state.graph.as_mut() {
                Some(graph) if running => {
                    graph.gain_mut().ramp_to(now, 0.0, fade);
                    true
                }
                Some(graph) => {
                    // No clock to run the fade on
                    graph.gain_mut().set_value(0.0);
                    false
                }
                None => false,
            };
            if faded {
                state.pending_pause = Some(now + fade);
            } else {
                state.pending_pause = None;
                state.set_paused();
            }
            debug!(track = ?state.current_id, "Playback stopping");
        });
    }

    // ===== Observation =====

    /// Subscribe to state ticks
    ///
    /// The callback also runs once immediately with the current state.
    pub fn on_tick<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&TickInfo) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let registered = Arc::clone(&callback);
        let subscription = self.inner.ticks.subscribe(move |tick| registered(tick));
        callback(&self.state());
        subscription
    }

    /// Subscribe to terminal notifications
    pub fn on_preview_end<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PreviewEndInfo) + Send + Sync + 'static,
    {
        self.inner.preview_ends.subscribe(callback)
    }

    /// Current media state
    pub fn state(&self) -> TickInfo {
        self.inner.state.lock().snapshot()
    }

    pub fn current_id(&self) -> Option<TrackId> {
        self.inner.state.lock().current_id.clone()
    }

    /// Preview end armed for the next terminal notification
    pub fn active_preview_end(&self) -> Option<f64> {
        self.inner
            .state
            .lock()
            .target
            .as_ref()
            .and_then(|t| t.preview_end)
    }

    /// Gain at the current output time
    pub fn gain(&self) -> f32 {
        let state = self.inner.state.lock();
        state
            .graph
            .as_ref()
            .map_or(0.0, |graph| graph.gain().value_at(state.clock))
    }

    /// Output clock (seconds rendered while running)
    pub fn clock(&self) -> f64 {
        self.inner.state.lock().clock
    }

    // ===== Rendering =====

    /// Pull interleaved stereo output
    ///
    /// Returns the number of frames written. Produces silence while the
    /// output is suspended or nothing is playing.
    pub fn render(&self, buffer: &mut [f32]) -> usize {
        let quantum = self.inner.config.quantum();
        let frames = buffer.len() / 2;
        let (audio, tail) = buffer.split_at_mut(frames * 2);
        tail.fill(0.0);

        for block in audio.chunks_mut(quantum * 2) {
            self.with_state(|state| self.process_quantum(state, block));
        }
        frames
    }

    // ===== Internals =====

    /// Run `f` under the state lock, then dispatch the events it queued
    fn with_state<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> R {
        let (result, events) = {
            let mut state = self.inner.state.lock();
            let result = f(&mut state);
            (result, std::mem::take(&mut state.events))
        };
        for event in events {
            match event {
                EngineEvent::Tick(tick) => self.inner.ticks.emit(&tick),
                EngineEvent::End(info) => self.inner.preview_ends.emit(&info),
            }
        }
        result
    }

    fn ensure_graph(&self, state: &mut EngineState) {
        let output = self.inner.output.as_ref();
        if state.graph.is_none() {
            state.graph = Some(ResourceGraph::build(output, &self.inner.config));
            return;
        }
        let rebind = state
            .graph
            .as_mut()
            .map_or(Rebind::Unchanged, |graph| graph.rebind(output));
        if rebind == Rebind::Resampled {
            self.reopen_source(state);
        }
    }

    /// Reopen the current URL at the new output rate, keeping position
    fn reopen_source(&self, state: &mut EngineState) {
        let (Some(url), Some(graph)) = (state.media.url.clone(), state.graph.as_ref()) else {
            return;
        };
        let sample_rate = graph.sample_rate();
        let position = state.media.current_time;
        let paused = state.media.paused;
        let limit = state.media.limit;

        match self.inner.loader.open(&url, sample_rate) {
            Ok(source) => {
                state.media.load(url, source);
                state.media.seek(position);
                state.media.paused = paused;
                state.media.limit = limit;
                debug!(sample_rate, position, "Source reopened for new output rate");
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to reopen source after device change");
                state.media.unload();
                state.push_tick();
            }
        }
    }

    fn cue_locked(&self, state: &mut EngineState, request: PlayRequest) -> Result<()> {
        let Some(sample_rate) = state.graph.as_ref().map(ResourceGraph::sample_rate) else {
            return Err(PlaybackError::NotEnabled);
        };
        let now = state.clock;
        let window = request.window();
        let url_changed = state.media.url.as_deref() != Some(request.url.as_str());

        state.pending_pause = None;
        state.current_id = Some(request.id.clone());

        if url_changed {
            if let Some(graph) = state.graph.as_mut() {
                graph.gain_mut().set_value(0.0);
            }
            state.media.unload();

            match self.inner.loader.open(&request.url, sample_rate) {
                Ok(source) => {
                    state.media.load(request.url.clone(), source);
                    debug!(track = %request.id, url = %request.url, "Source loaded");
                }
                Err(e) => {
                    warn!(
                        track = %request.id,
                        url = %request.url,
                        error = %e,
                        "Failed to load source; staying paused"
                    );
                    state.target = None;
                    state.push_tick();
                    return Ok(());
                }
            }
            state.push_tick();
        }

        state.media.seek(window.map_or(0.0, |w| w.start));
        state.media.limit = window.map(|w| w.end);
        state.target = Some(TerminalTarget {
            id: request.id.clone(),
            preview_end: window.map(|w| w.end),
        });

        if let Some(graph) = state.graph.as_mut() {
            graph
                .gain_mut()
                .ramp_to(now, 1.0, self.inner.config.fade_in_sec());
        }

        state.media.paused = false;
        state.media.ended = false;
        state.push_tick();

        info!(
            track = %request.id,
            preview_start = ?window.map(|w| w.start),
            preview_end = ?window.map(|w| w.end),
            "Playback started"
        );
        Ok(())
    }

    fn process_quantum(&self, state: &mut EngineState, block: &mut [f32]) {
        block.fill(0.0);
        if self.inner.output.state() != OutputState::Running {
            return;
        }
        let Some(graph) = state.graph.as_mut() else {
            return;
        };

        let config = &self.inner.config;
        let sample_rate = graph.sample_rate();
        let frames = block.len() / 2;
        let start_time = state.clock;

        let mut reached_end = false;
        let mut failure = None;
        let mut duration_learned = false;

        if state.media.is_playing() {
            let allowed = state.media.frames_until_limit(sample_rate, frames);
            let media = &mut state.media;
            if let Some(source) = media.source.as_mut() {
                match source.read_samples(&mut block[..allowed * 2]) {
                    Ok(read) => {
                        media.current_time = source.position().as_secs_f64();
                        media.buffered = source.buffered();
                        if media.duration.is_none() {
                            media.duration = source.duration().map(|d| d.as_secs_f64());
                            duration_learned = media.duration.is_some();
                        }
                        reached_end = source.is_finished() || (read == 0 && allowed > 0);
                    }
                    Err(e) => failure = Some(e),
                }
            }
        }

        graph.process(block, start_time);
        state.clock += frames as f64 / f64::from(sample_rate);

        if let Some(e) = failure {
            warn!(track = ?state.current_id, error = %e, "Decode failed; pausing");
            state.set_paused();
            return;
        }
        if duration_learned {
            state.push_tick();
        }

        if state.pending_pause.is_some_and(|at| state.clock >= at) {
            state.pending_pause = None;
            state.set_paused();
        }

        if !state.media.paused {
            let boundary = state
                .target
                .as_ref()
                .and_then(|t| t.preview_end.map(|end| (t.id.clone(), end)));
            if let Some((id, end)) = boundary {
                if state.media.current_time >= end - config.preview_end_margin_sec {
                    let fade = config.preview_end_fade_sec();
                    let now = state.clock;
                    if let Some(graph) = state.graph.as_mut() {
                        graph.gain_mut().ramp_to(now, 0.0, fade);
                    }
                    state.pending_pause = Some(now + fade);
                    state.target = None;
                    debug!(track = %id, at = state.media.current_time, "Preview window reached");
                    state.push_end(id, EndReason::PreviewEnd);
                }
            }
        }

        if reached_end {
            state.media.ended = true;
            state.media.paused = true;
            state.pending_pause = None;
            state.push_tick();
            if let Some(target) = state.target.take() {
                debug!(track = %target.id, "Source ended");
                state.push_end(target.id, EndReason::Ended);
            }
        } else if state.media.is_playing()
            && (state.media.current_time - state.media.last_tick_time).abs()
                >= config.time_update_interval_sec()
        {
            state.push_tick();
        }
    }
}
