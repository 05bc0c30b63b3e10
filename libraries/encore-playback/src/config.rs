//! Engine and sequencer tuning

use serde::{Deserialize, Serialize};

/// Playback engine configuration
///
/// All timings are expressed on the output clock, not wall time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Gain ramp 0 -> 1 when playback starts (ms)
    pub fade_in_ms: u32,

    /// Gain ramp -> 0 on stop (ms)
    pub fade_out_ms: u32,

    /// Preview end fires this early to hide the fade (seconds)
    pub preview_end_margin_sec: f64,

    /// Upper bound for the fade applied at a preview boundary (ms)
    pub preview_end_fade_ms: u32,

    /// Media-time interval between periodic ticks (ms)
    pub time_update_interval_ms: u32,

    /// Frames processed per automation step
    pub render_quantum_frames: usize,

    /// Analyser FFT size (power of two)
    pub fft_size: usize,

    /// Analyser smoothing time constant (0..1)
    pub analyser_smoothing: f32,

    /// dB mapped to byte 0
    pub min_decibels: f32,

    /// dB mapped to byte 255
    pub max_decibels: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fade_in_ms: 120,
            fade_out_ms: 140,
            preview_end_margin_sec: 0.03,
            preview_end_fade_ms: 80,
            time_update_interval_ms: 250,
            render_quantum_frames: 128,
            fft_size: 2048,
            analyser_smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl EngineConfig {
    pub fn fade_in_sec(&self) -> f64 {
        f64::from(self.fade_in_ms) / 1000.0
    }

    pub fn fade_out_sec(&self) -> f64 {
        f64::from(self.fade_out_ms) / 1000.0
    }

    /// Fade used when a preview boundary is reached: `min(preview_end_fade, fade_out)`
    pub fn preview_end_fade_sec(&self) -> f64 {
        f64::from(self.preview_end_fade_ms.min(self.fade_out_ms)) / 1000.0
    }

    pub fn time_update_interval_sec(&self) -> f64 {
        f64::from(self.time_update_interval_ms) / 1000.0
    }

    /// Quantum size with a floor of one frame
    pub fn quantum(&self) -> usize {
        self.render_quantum_frames.max(1)
    }

    /// FFT size rounded to a power of two within 32..=32768
    pub fn analyser_fft_size(&self) -> usize {
        self.fft_size.clamp(32, 32768).next_power_of_two()
    }
}

/// Continuous preview sequencer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Window length used when a track has no explicit preview end (seconds)
    pub default_window_sec: f64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            default_window_sec: 30.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_timings() {
        let config = EngineConfig::default();
        assert_eq!(config.fade_in_sec(), 0.12);
        assert_eq!(config.fade_out_sec(), 0.14);
        assert_eq!(config.preview_end_fade_sec(), 0.08);
        assert_eq!(config.time_update_interval_sec(), 0.25);
    }

    #[test]
    fn preview_end_fade_never_exceeds_fade_out() {
        let config = EngineConfig {
            fade_out_ms: 50,
            ..EngineConfig::default()
        };
        assert_eq!(config.preview_end_fade_sec(), 0.05);
    }

    #[test]
    fn fft_size_is_normalized() {
        let config = EngineConfig {
            fft_size: 1000,
            ..EngineConfig::default()
        };
        assert_eq!(config.analyser_fft_size(), 1024);

        let tiny = EngineConfig {
            fft_size: 0,
            ..EngineConfig::default()
        };
        assert_eq!(tiny.analyser_fft_size(), 32);
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"fade_in_ms": 50}"#).unwrap();
        assert_eq!(config.fade_in_ms, 50);
        assert_eq!(config.fade_out_ms, 140);
    }
}
