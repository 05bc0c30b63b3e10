//! Drawing surfaces

use crate::color::Color;

/// Axis-aligned rectangle in surface pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Something the renderer can paint onto
///
/// Coordinates are in logical pixels with the origin at the top-left.
pub trait Surface {
    /// Clear the viewport to transparent
    fn clear(&mut self, width: f64, height: f64);

    /// Paint the whole viewport with one colour
    fn fill(&mut self, color: Color, width: f64, height: f64);

    /// Paint a rectangle
    fn fill_rect(&mut self, rect: Rect, color: Color);
}

/// A single recorded drawing instruction
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear { width: f64, height: f64 },
    Fill { color: Color, width: f64, height: f64 },
    FillRect { rect: Rect, color: Color },
}

/// Surface that records instructions instead of rasterizing them
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingSurface {
    ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded instructions in draw order
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Only the rectangle fills
    pub fn rects(&self) -> impl Iterator<Item = (&Rect, &Color)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::FillRect { rect, color } => Some((rect, color)),
            _ => None,
        })
    }

    /// Drop everything recorded so far
    pub fn take(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self, width: f64, height: f64) {
        self.ops.push(DrawOp::Clear { width, height });
    }

    fn fill(&mut self, color: Color, width: f64, height: f64) {
        self.ops.push(DrawOp::Fill {
            color,
            width,
            height,
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }
}
