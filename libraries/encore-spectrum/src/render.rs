//! Block-bar rendering

use crate::color::{clamp, Color, Hsla, Rgba};
use crate::error::Result;
use crate::layout::Layout;
use crate::options::{BlockBarsOptions, Fill, PaletteMode, ResolvedOptions};
use crate::surface::{Rect, Surface};

/// Perceptual curve applied to normalized bin magnitudes
const LEVEL_EXPONENT: f64 = 0.82;

/// A bar counts as rising when it grows by more than this many pixels
const RISE_THRESHOLD: f64 = 0.6;

/// Palette phase offset per block in [`PaletteMode::PerBlock`]
const BLOCK_PHASE_STEP: f64 = 0.03;

/// Lightness added per stacked block in hue mode
const BLOCK_LIGHT_STEP: f64 = 0.6;

// ===== Frame drawing =====

/// Draw one frame of block bars
///
/// `levels` carries smoothed bar heights between frames; bars beyond its
/// length start from zero and are not remembered. `frame` drives palette
/// cycling and hue rotation.
///
/// Returns the layout that was used.
pub fn draw_block_bars(
    surface: &mut dyn Surface,
    spectrum: &[u8],
    levels: &mut [f64],
    width: f64,
    height: f64,
    options: &ResolvedOptions,
    frame: u64,
) -> Layout {
    match options.background {
        Some(color) => surface.fill(color, width, height),
        None => surface.clear(width, height),
    }

    let layout = Layout::compute(width, options);
    if spectrum.is_empty() {
        return layout;
    }

    let bins_per_bar = (spectrum.len() / layout.bars).max(1);
    let smoothing = options.smoothing;
    let frame = frame as f64;

    for i in 0..layout.bars {
        let start = (i * bins_per_bar).min(spectrum.len());
        let end = (start + bins_per_bar).min(spectrum.len());
        let bins = &spectrum[start..end];

        let norm = if bins.is_empty() {
            0.0
        } else {
            let sum: f64 = bins.iter().map(|&v| f64::from(v)).sum();
            (sum / bins.len() as f64 / 255.0).powf(LEVEL_EXPONENT)
        };

        let prev = levels.get(i).copied().unwrap_or(0.0);
        let level = prev * smoothing + norm * height * (1.0 - smoothing);
        if let Some(slot) = levels.get_mut(i) {
            *slot = level;
        }

        let rising = level > prev + RISE_THRESHOLD;
        let x = layout.bar_x(i);
        let bar_phase = i as f64 / layout.bars.saturating_sub(1).max(1) as f64
            + frame * options.palette_cycle_speed;

        for b in 0..layout.blocks_for(level) {
            let color = block_color(options, i, b, bar_phase, rising, frame);
            let rect = Rect {
                x,
                y: layout.block_y(b, height),
                width: layout.bar_width,
                height: layout.block_height,
            };
            surface.fill_rect(rect, color);
        }
    }

    layout
}

fn block_color(
    options: &ResolvedOptions,
    bar: usize,
    block: usize,
    bar_phase: f64,
    rising: bool,
    frame: f64,
) -> Color {
    let block = block as f64;
    let alpha = clamp(options.alpha_base + block * options.alpha_step, 0.0, 1.0);

    match &options.fill {
        Fill::Solid(color) => *color,
        Fill::Palette(palette) => {
            let phase = match options.palette_mode {
                PaletteMode::PerBlock => bar_phase + block * BLOCK_PHASE_STEP,
                PaletteMode::PerBar => bar_phase,
            };
            Color::Rgba(sample_palette(palette, phase, alpha))
        }
        Fill::Hue => {
            let hue = (options.hue_base
                + frame * options.hue_rotate
                + bar as f64 * options.hue_stride)
                % 360.0;
            let boost = |base: f64, extra: f64| {
                clamp(base + if rising { extra } else { 0.0 }, 0.0, 100.0)
            };
            let sat = boost(options.sat, options.sat_rise_boost);
            let light = boost(options.light, options.light_rise_boost);
            let light = clamp(light + block * BLOCK_LIGHT_STEP, 0.0, 100.0);
            Color::Hsla(Hsla::new(hue, sat, light, alpha))
        }
    }
}

/// Colour at `phase` along a cyclic gradient through `palette`
///
/// The phase wraps into `[0, 1)`; each entry owns an equal segment and
/// blends linearly into the next one, the last wrapping to the first.
pub fn sample_palette(palette: &[Rgba], phase: f64, alpha: f64) -> Rgba {
    match palette {
        [] => Rgba::FALLBACK,
        [only] => only.with_alpha(alpha),
        _ => {
            let n = palette.len();
            let p = ((phase % 1.0) + 1.0) % 1.0;
            let p = if p.is_finite() { p } else { 0.0 };
            let segment = 1.0 / n as f64;
            let idx = ((p / segment).floor() as usize).min(n - 1);
            let t = (p - idx as f64 * segment) / segment;
            palette[idx].mix(palette[(idx + 1) % n], t).with_alpha(alpha)
        }
    }
}

// ===== Stateful renderer =====

/// Block-bar renderer that keeps smoothing state and a frame counter
///
/// Feed it one spectrum snapshot per animation frame. Changing the
/// viewport size resets the smoothed levels.
#[derive(Debug, Clone)]
pub struct BlockBars {
    options: ResolvedOptions,
    levels: Vec<f64>,
    frame: u64,
    viewport: Option<(f64, f64)>,
}

impl BlockBars {
    /// Build a renderer, parsing its colours
    pub fn new(options: &BlockBarsOptions) -> Result<Self> {
        Ok(Self {
            options: options.resolve()?,
            levels: Vec::new(),
            frame: 0,
            viewport: None,
        })
    }

    /// Swap options without losing smoothing state
    pub fn set_options(&mut self, options: &BlockBarsOptions) -> Result<()> {
        self.options = options.resolve()?;
        tracing::debug!(square = self.options.square, "Spectrum options updated");
        Ok(())
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    /// Frames drawn so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Smoothed bar heights from the last frame (px)
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Forget smoothing state for a new viewport
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport = Some((width, height));
        self.levels.clear();
        tracing::debug!(width, height, "Spectrum viewport resized");
    }

    /// Draw the next frame
    pub fn draw(
        &mut self,
        surface: &mut dyn Surface,
        spectrum: &[u8],
        width: f64,
        height: f64,
    ) -> Layout {
        if self.viewport != Some((width, height)) {
            self.resize(width, height);
        }

        let bars = Layout::compute(width, &self.options).bars;
        if self.levels.len() < bars {
            self.levels.resize(bars, 0.0);
        }

        let layout = draw_block_bars(
            surface,
            spectrum,
            &mut self.levels,
            width,
            height,
            &self.options,
            self.frame,
        );
        self.frame = self.frame.wrapping_add(1);
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawOp, RecordingSurface};

    fn resolved(options: BlockBarsOptions) -> ResolvedOptions {
        options.resolve().unwrap()
    }

    #[test]
    fn silence_draws_only_background() {
        let options = resolved(BlockBarsOptions {
            bg_clear: Some("#0b1020".into()),
            ..BlockBarsOptions::default()
        });
        let mut surface = RecordingSurface::new();
        let mut levels = vec![0.0; 64];
        draw_block_bars(&mut surface, &[0; 1024], &mut levels, 400.0, 200.0, &options, 0);

        assert_eq!(surface.ops().len(), 1);
        assert!(matches!(surface.ops()[0], DrawOp::Fill { .. }));
    }

    #[test]
    fn transparent_clear_without_background() {
        let options = resolved(BlockBarsOptions::default());
        let mut surface = RecordingSurface::new();
        draw_block_bars(&mut surface, &[], &mut [], 100.0, 100.0, &options, 0);
        assert_eq!(
            surface.ops(),
            &[DrawOp::Clear {
                width: 100.0,
                height: 100.0
            }]
        );
    }

    #[test]
    fn full_scale_without_smoothing_fills_height() {
        let options = resolved(BlockBarsOptions {
            square: true,
            smoothing: 0.0,
            ..BlockBarsOptions::default()
        });
        let mut surface = RecordingSurface::new();
        let mut levels = vec![0.0; 8];
        let layout = draw_block_bars(
            &mut surface,
            &[255; 64],
            &mut levels,
            100.0,
            140.0,
            &options,
            0,
        );

        assert_eq!(layout.bars, 7);
        assert!(levels[..7].iter().all(|&l| (l - 140.0).abs() < 1e-9));
        // 140 / 14 = 10 blocks per bar
        assert_eq!(surface.rects().count(), 70);
    }

    #[test]
    fn smoothing_blends_with_previous_level() {
        let options = resolved(BlockBarsOptions {
            square: true,
            smoothing: 0.5,
            ..BlockBarsOptions::default()
        });
        let mut surface = RecordingSurface::new();
        let mut levels = vec![0.0; 7];

        draw_block_bars(&mut surface, &[255; 7], &mut levels, 100.0, 100.0, &options, 0);
        assert!((levels[0] - 50.0).abs() < 1e-9);

        draw_block_bars(&mut surface, &[255; 7], &mut levels, 100.0, 100.0, &options, 1);
        assert!((levels[0] - 75.0).abs() < 1e-9);
    }

    #[test]
    fn hue_rises_brighten_blocks() {
        let options = resolved(BlockBarsOptions {
            square: true,
            smoothing: 0.0,
            ..BlockBarsOptions::default()
        });
        let mut surface = RecordingSurface::new();
        let mut levels = vec![0.0; 7];
        draw_block_bars(&mut surface, &[255; 7], &mut levels, 100.0, 100.0, &options, 0);

        let (_, first) = surface.rects().next().unwrap();
        assert_eq!(*first, Color::Hsla(Hsla::new(210.0, 100.0, 60.0, 0.95)));
    }

    #[test]
    fn palette_samples_wrap_and_blend() {
        let palette = [Rgba::rgb(0.0, 0.0, 0.0), Rgba::rgb(200.0, 100.0, 0.0)];
        assert_eq!(sample_palette(&palette, 0.0, 1.0), palette[0]);
        assert_eq!(sample_palette(&palette, 0.25, 1.0), Rgba::rgb(100.0, 50.0, 0.0));
        assert_eq!(sample_palette(&palette, 0.75, 1.0), Rgba::rgb(100.0, 50.0, 0.0));
        assert_eq!(sample_palette(&palette, -0.75, 1.0), Rgba::rgb(100.0, 50.0, 0.0));
        assert_eq!(sample_palette(&[], 0.3, 0.5), Rgba::FALLBACK);
    }

    #[test]
    fn renderer_counts_frames_and_resets_on_resize() {
        let mut bars = BlockBars::new(&BlockBarsOptions {
            square: true,
            ..BlockBarsOptions::default()
        })
        .unwrap();
        let mut surface = RecordingSurface::new();

        bars.draw(&mut surface, &[200; 256], 100.0, 100.0);
        bars.draw(&mut surface, &[200; 256], 100.0, 100.0);
        assert_eq!(bars.frame(), 2);
        assert!(bars.levels()[0] > 0.0);

        bars.resize(300.0, 100.0);
        assert!(bars.levels().is_empty());
    }
}
