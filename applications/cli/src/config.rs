/// Application configuration
use crate::error::{CliError, Result};
use encore_playback::{EngineConfig, SequencerConfig};
use encore_spectrum::BlockBarsOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "encore.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_output")]
    pub output: OutputSettings,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub sequencer: SequencerConfig,

    #[serde(default = "default_preview")]
    pub preview: PreviewSettings,

    #[serde(default = "default_library")]
    pub library: LibrarySettings,

    #[serde(default = "default_spectrum")]
    pub spectrum: SpectrumSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputSettings {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Frames rendered per pump step
    #[serde(default = "default_block_frames")]
    pub block_frames: usize,
}

/// Preview window applied to every ingested track
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreviewSettings {
    #[serde(default = "default_preview_start")]
    pub start_sec: f64,

    #[serde(default = "default_preview_end")]
    pub end_sec: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibrarySettings {
    #[serde(default)]
    pub follow_links: bool,

    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Where the playback queue is persisted between runs
    #[serde(default)]
    pub queue_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpectrumSettings {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Animation frames per second of audio
    #[serde(default = "default_fps")]
    pub fps: u32,

    #[serde(default = "default_fft_size")]
    pub fft_size: usize,

    #[serde(default = "default_analyser_smoothing")]
    pub smoothing: f32,

    #[serde(default = "default_bars")]
    pub bars: BlockBarsOptions,
}

impl AppConfig {
    /// Load configuration from a file and the environment
    ///
    /// An explicit `path` must exist; otherwise `encore.toml` in the working
    /// directory is used when present. `ENCORE_`-prefixed variables override
    /// both, with `__` between nested keys (`ENCORE_ENGINE__FADE_IN_MS=200`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("ENCORE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(8000..=192_000).contains(&self.output.sample_rate) {
            return Err(CliError::Config(format!(
                "Unsupported sample rate: {}",
                self.output.sample_rate
            )));
        }

        if self.output.block_frames == 0 {
            return Err(CliError::Config("block_frames must be positive".to_string()));
        }

        let window_ok = self.preview.end_sec > self.preview.start_sec;
        if !window_ok {
            return Err(CliError::Config(format!(
                "Preview end ({}) must be after start ({})",
                self.preview.end_sec, self.preview.start_sec
            )));
        }

        let default_window_ok = self.sequencer.default_window_sec > 0.0;
        if !default_window_ok {
            return Err(CliError::Config(
                "sequencer.default_window_sec must be positive".to_string(),
            ));
        }

        if self.engine.min_decibels >= self.engine.max_decibels {
            return Err(CliError::Config(
                "engine.min_decibels must be below max_decibels".to_string(),
            ));
        }

        if self.spectrum.width == 0 || self.spectrum.height == 0 || self.spectrum.fps == 0 {
            return Err(CliError::Config(
                "Spectrum width, height and fps must be positive".to_string(),
            ));
        }

        self.spectrum.bars.resolve()?;

        Ok(())
    }

    /// Engine settings tuned for spectrum rendering
    pub fn spectrum_engine(&self) -> EngineConfig {
        EngineConfig {
            fft_size: self.spectrum.fft_size,
            analyser_smoothing: self.spectrum.smoothing,
            ..self.engine.clone()
        }
    }
}

// Default values
fn default_output() -> OutputSettings {
    OutputSettings {
        sample_rate: default_sample_rate(),
        block_frames: default_block_frames(),
    }
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_block_frames() -> usize {
    1024
}

fn default_preview() -> PreviewSettings {
    PreviewSettings {
        start_sec: default_preview_start(),
        end_sec: default_preview_end(),
    }
}

fn default_preview_start() -> f64 {
    45.0
}

fn default_preview_end() -> f64 {
    75.0
}

fn default_library() -> LibrarySettings {
    LibrarySettings {
        follow_links: false,
        max_depth: None,
        queue_file: None,
    }
}

fn default_spectrum() -> SpectrumSettings {
    SpectrumSettings {
        width: default_width(),
        height: default_height(),
        fps: default_fps(),
        fft_size: default_fft_size(),
        smoothing: default_analyser_smoothing(),
        bars: default_bars(),
    }
}

fn default_width() -> u32 {
    960
}

fn default_height() -> u32 {
    540
}

fn default_fps() -> u32 {
    60
}

fn default_fft_size() -> usize {
    1024
}

fn default_analyser_smoothing() -> f32 {
    0.9
}

fn default_bars() -> BlockBarsOptions {
    BlockBarsOptions {
        bg_clear: Some("#0b1020".to_string()),
        alpha_base: 1.0,
        alpha_step: 0.0,
        ..BlockBarsOptions::default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            engine: EngineConfig::default(),
            sequencer: SequencerConfig::default(),
            preview: default_preview(),
            library: default_library(),
            spectrum: default_spectrum(),
        }
    }
}
