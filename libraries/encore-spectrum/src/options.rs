//! Renderer options
//!
//! Options deserialize with every field optional. Out-of-range values are
//! clamped and non-finite ones replaced by their defaults when a renderer is
//! built from them, never rejected.

use crate::color::{clamp, finite_or, Color, Rgba};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// How palette phase advances across a bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaletteMode {
    /// Whole bar shares one colour
    #[default]
    PerBar,
    /// Each block shifts the phase slightly
    PerBlock,
}

/// Options for the block-bar renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockBarsOptions {
    /// Square-cell layout instead of classic bars
    pub square: bool,
    /// Cell edge length in square mode (px)
    pub cell_size: f64,
    /// Gap between cells in square mode (px)
    pub cell_gap: f64,

    /// Bar count in classic mode (defaults to `width / 7`)
    pub bars: Option<f64>,
    /// Gap between bars in classic mode (px)
    pub gap: f64,
    /// Block height in classic mode (px)
    pub block_height: f64,

    /// Level smoothing factor, `0..=0.99`
    pub smoothing: f64,
    /// Background fill; `None` clears to transparent
    pub bg_clear: Option<String>,

    /// Solid colour overriding palette and hue rotation
    pub color: Option<String>,
    /// Gradient palette (hex colours); needs at least two entries
    pub palette: Vec<String>,
    pub palette_mode: PaletteMode,
    pub palette_cycle_speed: f64,

    pub hue_base: f64,
    pub hue_rotate: f64,
    pub hue_stride: f64,
    pub sat: f64,
    pub sat_rise_boost: f64,
    pub light: f64,
    pub light_rise_boost: f64,
    pub alpha_base: f64,
    pub alpha_step: f64,
}

impl Default for BlockBarsOptions {
    fn default() -> Self {
        Self {
            square: false,
            cell_size: 12.0,
            cell_gap: 2.0,
            bars: None,
            gap: 1.5,
            block_height: 3.0,
            smoothing: 0.6,
            bg_clear: None,
            color: None,
            palette: Vec::new(),
            palette_mode: PaletteMode::PerBar,
            palette_cycle_speed: 0.01,
            hue_base: 210.0,
            hue_rotate: 0.6,
            hue_stride: 9.0,
            sat: 86.0,
            sat_rise_boost: 16.0,
            light: 48.0,
            light_rise_boost: 12.0,
            alpha_base: 0.95,
            alpha_step: 0.02,
        }
    }
}

impl BlockBarsOptions {
    /// Square-cell preset used by the full-screen background
    pub fn square_cells(cell_size: f64, cell_gap: f64) -> Self {
        Self {
            square: true,
            cell_size,
            cell_gap,
            ..Self::default()
        }
    }

    /// Clamp, default and parse everything the renderer needs
    ///
    /// Fails only when `color` or `bg_clear` is not a colour.
    pub fn resolve(&self) -> Result<ResolvedOptions> {
        let defaults = Self::default();
        let pick = |v: f64, fallback: f64| finite_or(v, fallback);

        let fill = match &self.color {
            Some(color) => Fill::Solid(Color::parse(color)?),
            None if self.palette.len() >= 2 => Fill::Palette(
                self.palette
                    .iter()
                    .map(|hex| Rgba::from_hex_or_fallback(hex))
                    .collect(),
            ),
            None => Fill::Hue,
        };

        let background = self.bg_clear.as_deref().map(Color::parse).transpose()?;

        Ok(ResolvedOptions {
            square: self.square,
            cell_size: pick(self.cell_size, defaults.cell_size).floor().max(2.0),
            cell_gap: pick(self.cell_gap, defaults.cell_gap).floor().max(0.0),
            bars: self.bars.filter(|b| b.is_finite()),
            gap: pick(self.gap, defaults.gap),
            block_height: pick(self.block_height, defaults.block_height).floor().max(1.0),
            smoothing: clamp(pick(self.smoothing, defaults.smoothing), 0.0, 0.99),
            background,
            fill,
            palette_mode: self.palette_mode,
            palette_cycle_speed: pick(self.palette_cycle_speed, defaults.palette_cycle_speed),
            hue_base: clamp(pick(self.hue_base, defaults.hue_base), 0.0, 360.0),
            hue_rotate: pick(self.hue_rotate, defaults.hue_rotate),
            hue_stride: pick(self.hue_stride, defaults.hue_stride),
            sat: clamp(pick(self.sat, defaults.sat), 0.0, 100.0),
            sat_rise_boost: clamp(pick(self.sat_rise_boost, defaults.sat_rise_boost), 0.0, 100.0),
            light: clamp(pick(self.light, defaults.light), 0.0, 100.0),
            light_rise_boost: clamp(
                pick(self.light_rise_boost, defaults.light_rise_boost),
                0.0,
                100.0,
            ),
            alpha_base: clamp(pick(self.alpha_base, defaults.alpha_base), 0.0, 1.0),
            alpha_step: clamp(pick(self.alpha_step, defaults.alpha_step), 0.0, 1.0),
        })
    }
}

/// Colour source for blocks
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Color),
    Palette(Vec<Rgba>),
    Hue,
}

/// Options after clamping and colour parsing
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub square: bool,
    pub cell_size: f64,
    pub cell_gap: f64,
    pub bars: Option<f64>,
    pub gap: f64,
    pub block_height: f64,
    pub smoothing: f64,
    pub background: Option<Color>,
    pub fill: Fill,
    pub palette_mode: PaletteMode,
    pub palette_cycle_speed: f64,
    pub hue_base: f64,
    pub hue_rotate: f64,
    pub hue_stride: f64,
    pub sat: f64,
    pub sat_rise_boost: f64,
    pub light: f64,
    pub light_rise_boost: f64,
    pub alpha_base: f64,
    pub alpha_step: f64,
}
