//! PNG rasterization of spectrum frames

use crate::error::Result;
use encore_spectrum::{Color, Rect, Rgba, Surface};
use image::{Rgba as Pixel, RgbaImage};
use std::path::Path;

/// [`Surface`] backed by an RGBA pixel buffer
///
/// Fills are composited source-over; rectangle edges snap to the nearest
/// pixel.
pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.image.save(path)?;
        tracing::debug!(path = %path.display(), "Frame written");
        Ok(())
    }

    /// Pixel span `[start, end)` covered by `[pos, pos + len)`, clipped to `limit`
    fn span(pos: f64, len: f64, limit: u32) -> (u32, u32) {
        let clip = |v: f64| {
            if v.is_finite() {
                v.round().clamp(0.0, f64::from(limit)) as u32
            } else {
                0
            }
        };
        (clip(pos), clip(pos + len))
    }

    fn blend_span(&mut self, x: (u32, u32), y: (u32, u32), color: Rgba) {
        let [r, g, b, a] = color.to_u8();
        if a == 0 {
            return;
        }
        for py in y.0..y.1 {
            for px in x.0..x.1 {
                let dst = self.image.get_pixel_mut(px, py);
                *dst = source_over(Pixel([r, g, b, a]), *dst);
            }
        }
    }
}

/// Composite `src` over `dst` (straight alpha)
fn source_over(src: Pixel<u8>, dst: Pixel<u8>) -> Pixel<u8> {
    let sa = f32::from(src.0[3]) / 255.0;
    let da = f32::from(dst.0[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Pixel([0, 0, 0, 0]);
    }

    let channel = |s: u8, d: u8| {
        let value = (f32::from(s) * sa + f32::from(d) * da * (1.0 - sa)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };
    Pixel([
        channel(src.0[0], dst.0[0]),
        channel(src.0[1], dst.0[1]),
        channel(src.0[2], dst.0[2]),
        (out_a * 255.0).round() as u8,
    ])
}

impl Surface for RasterSurface {
    fn clear(&mut self, width: f64, height: f64) {
        let x = Self::span(0.0, width, self.width());
        let y = Self::span(0.0, height, self.height());
        for py in y.0..y.1 {
            for px in x.0..x.1 {
                self.image.put_pixel(px, py, Pixel([0, 0, 0, 0]));
            }
        }
    }

    fn fill(&mut self, color: Color, width: f64, height: f64) {
        let x = Self::span(0.0, width, self.width());
        let y = Self::span(0.0, height, self.height());
        self.blend_span(x, y, color.to_rgba());
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let x = Self::span(rect.x, rect.width, self.width());
        let y = Self::span(rect.y, rect.height, self.height());
        self.blend_span(x, y, color.to_rgba());
    }
}
