//! Frequency analysis tap
//!
//! Receives the pre-gain signal so fades never blank the visualizer. Keeps
//! the most recent `fft_size` mono samples; each snapshot applies a Blackman
//! window, runs a forward FFT, smooths magnitudes over time and maps them to
//! bytes between `min_decibels` and `max_decibels`.

use parking_lot::Mutex;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::config::EngineConfig;

/// Shared handle to the analysis tap
///
/// Cloning is cheap; all clones observe the same signal.
#[derive(Clone)]
pub struct Analyser {
    inner: Arc<Mutex<AnalyserState>>,
}

struct AnalyserState {
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    ring: Vec<f32>,
    write_pos: usize,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for Analyser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Analyser")
            .field("fft_size", &state.fft_size)
            .field("smoothing", &state.smoothing)
            .finish_non_exhaustive()
    }
}

impl Analyser {
    pub fn new(config: &EngineConfig) -> Self {
        let fft_size = config.analyser_fft_size();
        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);

        let state = AnalyserState {
            fft_size,
            smoothing: config.analyser_smoothing.clamp(0.0, 1.0),
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            ring: vec![0.0; fft_size],
            write_pos: 0,
            window: blackman_window(fft_size),
            smoothed: vec![0.0; fft_size / 2],
            fft,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        };

        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.inner.lock().fft_size
    }

    /// Number of frequency bins in a snapshot (`fft_size / 2`)
    pub fn frequency_bin_count(&self) -> usize {
        self.inner.lock().fft_size / 2
    }

    /// Change the smoothing time constant (0..1)
    pub fn set_smoothing(&self, smoothing: f32) {
        self.inner.lock().smoothing = smoothing.clamp(0.0, 1.0);
    }

    /// Feed interleaved stereo samples (mixed down to mono)
    pub fn push_interleaved(&self, samples: &[f32]) {
        let mut state = self.inner.lock();
        for frame in samples.chunks(2) {
            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
            state.push(mono);
        }
    }

    /// Most recent time-domain samples, oldest first
    pub fn time_domain_data(&self, out: &mut [f32]) {
        let state = self.inner.lock();
        let n = state.fft_size;
        for (i, slot) in out.iter_mut().take(n).enumerate() {
            *slot = state.ring[(state.write_pos + i) % n];
        }
    }

    /// Smoothed magnitude spectrum in dB
    pub fn float_frequency_data(&self, out: &mut [f32]) {
        let mut state = self.inner.lock();
        state.analyse();
        for (slot, &magnitude) in out.iter_mut().zip(state.smoothed.iter()) {
            *slot = to_decibels(magnitude);
        }
    }

    /// Smoothed magnitude spectrum scaled to bytes
    ///
    /// Writes `min(out.len(), frequency_bin_count())` values.
    pub fn byte_frequency_data(&self, out: &mut [u8]) {
        let mut state = self.inner.lock();
        state.analyse();
        let range = (state.max_decibels - state.min_decibels).max(f32::EPSILON);
        for (slot, &magnitude) in out.iter_mut().zip(state.smoothed.iter()) {
            let db = to_decibels(magnitude);
            let scaled = 255.0 * (db - state.min_decibels) / range;
            *slot = scaled.clamp(0.0, 255.0) as u8;
        }
    }

    /// Clear history (used when the graph is rebuilt for a new session)
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        state.ring.fill(0.0);
        state.smoothed.fill(0.0);
        state.write_pos = 0;
    }
}

impl AnalyserState {
    fn push(&mut self, sample: f32) {
        self.ring[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.fft_size;
    }

    fn analyse(&mut self) {
        let n = self.fft_size;
        for i in 0..n {
            let sample = self.ring[(self.write_pos + i) % n];
            self.scratch[i] = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let tau = self.smoothing;
        let scale = 1.0 / n as f32;
        for (bin, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.scratch[bin].norm() * scale;
            let next = tau * *smoothed + (1.0 - tau) * magnitude;
            *smoothed = if next.is_finite() { next } else { 0.0 };
        }
    }
}

fn to_decibels(magnitude: f32) -> f32 {
    if magnitude <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * magnitude.log10()
    }
}

fn blackman_window(n: usize) -> Vec<f32> {
    let (a0, a1, a2) = (0.42, 0.5, 0.08);
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
        })
        .collect()
}
