//! Bar layout strategies
//!
//! Both strategies produce the same [`Layout`] so quantization and filling
//! don't care which one was used.

use crate::options::ResolvedOptions;

/// Upper bound on bars in either layout
pub const MAX_BARS: usize = 2000;

/// Fewest bars the classic layout will draw
pub const MIN_CLASSIC_BARS: usize = 8;

/// Geometry of one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    /// Number of bars (columns)
    pub bars: usize,
    /// Width of each bar (px)
    pub bar_width: f64,
    /// Horizontal gap between bars (px)
    pub gap: f64,
    /// Height of one block (px)
    pub block_height: f64,
    /// Vertical distance between stacked blocks (px)
    pub pitch: f64,
}

impl Layout {
    /// Equal-sized square cells separated by `cell_gap`
    pub fn square(width: f64, cell_size: f64, cell_gap: f64) -> Self {
        let columns = ((width + cell_gap) / (cell_size + cell_gap)).floor();
        let bars = columns.clamp(1.0, MAX_BARS as f64) as usize;
        Self {
            bars,
            bar_width: cell_size,
            gap: cell_gap,
            block_height: cell_size,
            pitch: cell_size + cell_gap,
        }
    }

    /// Bars spread across the width with thin blocks
    ///
    /// Bar count defaults to one per 7 px and stays within
    /// [`MIN_CLASSIC_BARS`]..=[`MAX_BARS`].
    pub fn classic(width: f64, bars: Option<f64>, gap: f64, block_height: f64) -> Self {
        let requested = bars.unwrap_or_else(|| (width / 7.0).floor()).floor();
        let bars = if requested.is_finite() && requested > MIN_CLASSIC_BARS as f64 {
            requested.min(MAX_BARS as f64) as usize
        } else {
            MIN_CLASSIC_BARS
        };
        let n = bars as f64;
        let bar_width = ((width - (n - 1.0) * gap) / n).floor().max(1.0);
        Self {
            bars,
            bar_width,
            gap,
            block_height,
            pitch: block_height + 1.0,
        }
    }

    /// Layout for the given viewport width and options
    pub fn compute(width: f64, options: &ResolvedOptions) -> Self {
        if options.square {
            Self::square(width, options.cell_size, options.cell_gap)
        } else {
            Self::classic(width, options.bars, options.gap, options.block_height)
        }
    }

    /// Left edge of bar `i`
    pub fn bar_x(&self, i: usize) -> f64 {
        (i as f64 * (self.bar_width + self.gap)).round()
    }

    /// Top edge of block `b` (counted from the bottom) in a viewport of `height`
    pub fn block_y(&self, b: usize, height: f64) -> f64 {
        height - (b as f64 + 1.0) * self.pitch - self.block_height
    }

    /// Whole blocks a bar of `level` px stacks
    pub fn blocks_for(&self, level: f64) -> usize {
        let blocks = (level / self.pitch).floor();
        if blocks.is_finite() && blocks > 0.0 {
            blocks as usize
        } else {
            0
        }
    }
}
