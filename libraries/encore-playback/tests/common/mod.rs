//! Shared fixtures for engine tests

#![allow(dead_code)]

use encore_playback::{
    EngineConfig, HeadlessOutput, MediaSource, PlaybackError, PreviewEngine, Result, SourceLoader,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Duration;

pub const SAMPLE_RATE: u32 = 48000;

// ============================================================================
// TEST SOURCES
// ============================================================================

/// Sine tone of fixed length
///
/// An infinite duration gives an endless tone that reports no length, like
/// a live stream.
pub struct ToneSource {
    sample_rate: u32,
    frequency: f32,
    amplitude: f32,
    position_frames: usize,
    total_frames: usize,
}

impl ToneSource {
    pub fn new(duration_secs: f64, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            frequency: 440.0,
            amplitude: 0.5,
            position_frames: 0,
            total_frames: (duration_secs * f64::from(sample_rate)) as usize,
        }
    }
}

impl MediaSource for ToneSource {
    fn read_samples(&mut self, buffer: &mut [f32]) -> Result<usize> {
        let frames = (buffer.len() / 2).min(self.total_frames - self.position_frames);
        for i in 0..frames {
            let t = (self.position_frames + i) as f32 / self.sample_rate as f32;
            let sample = self.amplitude * (2.0 * PI * self.frequency * t).sin();
            buffer[i * 2] = sample;
            buffer[i * 2 + 1] = sample;
        }
        self.position_frames += frames;
        Ok(frames * 2)
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        let frames = (position.as_secs_f64() * f64::from(self.sample_rate)) as usize;
        if self.total_frames == usize::MAX {
            self.position_frames = frames;
            return Ok(());
        }
        self.position_frames = frames.min(self.total_frames);
        Ok(())
    }

    fn duration(&self) -> Option<Duration> {
        if self.total_frames == usize::MAX {
            return None;
        }
        Some(Duration::from_secs_f64(
            self.total_frames as f64 / f64::from(self.sample_rate),
        ))
    }

    fn position(&self) -> Duration {
        Duration::from_secs_f64(self.position_frames as f64 / f64::from(self.sample_rate))
    }

    fn is_finished(&self) -> bool {
        self.position_frames >= self.total_frames
    }
}

/// Loader serving tones by URL; unknown URLs fail like unreadable files
#[derive(Default)]
pub struct ToneLoader {
    durations: HashMap<String, f64>,
    opened: Mutex<Vec<(String, u32)>>,
}

impl ToneLoader {
    pub fn new(tracks: &[(&str, f64)]) -> Self {
        Self {
            durations: tracks
                .iter()
                .map(|(url, duration)| ((*url).to_string(), *duration))
                .collect(),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// `(url, sample_rate)` for every successful open
    pub fn opened(&self) -> Vec<(String, u32)> {
        self.opened.lock().clone()
    }
}

impl SourceLoader for ToneLoader {
    fn open(&self, url: &str, sample_rate: u32) -> Result<Box<dyn MediaSource>> {
        let duration = self
            .durations
            .get(url)
            .ok_or_else(|| PlaybackError::AudioSource(format!("cannot open {url}")))?;
        self.opened.lock().push((url.to_string(), sample_rate));
        Ok(Box::new(ToneSource::new(*duration, sample_rate)))
    }
}

// ============================================================================
// HARNESS
// ============================================================================

pub struct Harness {
    pub engine: PreviewEngine,
    pub output: Arc<HeadlessOutput>,
    pub loader: Arc<ToneLoader>,
}

pub fn harness(tracks: &[(&str, f64)]) -> Harness {
    harness_with_config(tracks, EngineConfig::default())
}

pub fn harness_with_config(tracks: &[(&str, f64)], config: EngineConfig) -> Harness {
    let output = Arc::new(HeadlessOutput::new(SAMPLE_RATE));
    let loader = Arc::new(ToneLoader::new(tracks));
    let engine = PreviewEngine::with_config(config, output.clone(), loader.clone());
    Harness {
        engine,
        output,
        loader,
    }
}

/// Render `seconds` of output in device-sized buffers
pub fn run_for(engine: &PreviewEngine, seconds: f64) {
    const FRAMES: usize = 512;
    let mut buffer = vec![0.0f32; 2 * FRAMES];
    let blocks = (seconds * f64::from(SAMPLE_RATE) / FRAMES as f64).ceil() as usize;
    for _ in 0..blocks {
        engine.render(&mut buffer);
    }
}

/// Collects events delivered to a listener
#[derive(Clone)]
pub struct Recorder<T> {
    events: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sink(&self) -> impl Fn(&T) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event: &T| events.lock().push(event.clone())
    }

    pub fn events(&self) -> Vec<T> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}
