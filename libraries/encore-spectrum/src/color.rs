//! Colour values used by the renderer
//!
//! Fill colours are kept in the form they were computed in (palette
//! interpolation yields RGBA, hue rotation yields HSLA) so that recorded
//! frames can be compared exactly. Raster surfaces convert through
//! [`Color::to_rgba`].

use crate::error::{Result, SpectrumError};
use std::fmt;
use std::str::FromStr;

pub(crate) fn clamp(v: f64, min: f64, max: f64) -> f64 {
    v.max(min).min(max)
}

/// Replace non-finite values with a fallback
pub(crate) fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

// ===== RGBA =====

/// RGB colour with channels in `0..=255` and alpha in `0..=1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    /// Colour used when a palette entry cannot be parsed
    pub const FALLBACK: Self = Self::rgb(255.0, 0.0, 128.0);

    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    /// Opaque colour
    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Same colour with a different alpha (clamped to `0..=1`)
    #[must_use]
    pub fn with_alpha(self, a: f64) -> Self {
        Self {
            a: clamp(a, 0.0, 1.0),
            ..self
        }
    }

    /// Linear interpolation between two colours, keeping `self`'s alpha
    #[must_use]
    pub fn mix(self, other: Self, t: f64) -> Self {
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a,
        }
    }

    /// Parse a 6-digit hex colour, falling back to [`Rgba::FALLBACK`]
    ///
    /// Palettes are lenient: a bad entry paints in the fallback colour
    /// instead of rejecting the whole palette.
    pub fn from_hex_or_fallback(hex: &str) -> Self {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 {
            return Self::FALLBACK;
        }
        match u32::from_str_radix(digits, 16) {
            Ok(v) => Self::rgb(
                f64::from((v >> 16) & 0xff),
                f64::from((v >> 8) & 0xff),
                f64::from(v & 0xff),
            ),
            Err(_) => Self::FALLBACK,
        }
    }

    /// 8-bit RGBA with channels truncated the way CSS `rgba()` output is
    pub fn to_u8(self) -> [u8; 4] {
        let channel = |v: f64| clamp(v.trunc(), 0.0, 255.0) as u8;
        [
            channel(self.r),
            channel(self.g),
            channel(self.b),
            (clamp(self.a, 0.0, 1.0) * 255.0).round() as u8,
        ]
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, _] = self.to_u8();
        write!(f, "rgba({r},{g},{b},{})", clamp(self.a, 0.0, 1.0))
    }
}

// ===== HSLA =====

/// HSL colour: hue in degrees, saturation and lightness in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
    pub h: f64,
    pub s: f64,
    pub l: f64,
    pub a: f64,
}

impl Hsla {
    /// Build a colour with sanitized components
    ///
    /// Hue, saturation and lightness are rounded to integers and clamped;
    /// alpha is clamped and rounded to three decimals. Non-finite inputs
    /// fall back to 0 (alpha to 1).
    pub fn new(h: f64, s: f64, l: f64, a: f64) -> Self {
        Self {
            h: clamp(finite_or(h, 0.0), 0.0, 360.0).round(),
            s: clamp(finite_or(s, 0.0), 0.0, 100.0).round(),
            l: clamp(finite_or(l, 0.0), 0.0, 100.0).round(),
            a: (clamp(finite_or(a, 1.0), 0.0, 1.0) * 1000.0).round() / 1000.0,
        }
    }

    /// Convert to RGB
    pub fn to_rgba(self) -> Rgba {
        let s = self.s / 100.0;
        let l = self.l / 100.0;
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let hp = (self.h % 360.0) / 60.0;
        let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
        let (r, g, b) = match hp {
            hp if hp < 1.0 => (c, x, 0.0),
            hp if hp < 2.0 => (x, c, 0.0),
            hp if hp < 3.0 => (0.0, c, x),
            hp if hp < 4.0 => (0.0, x, c),
            hp if hp < 5.0 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        Rgba {
            r: ((r + m) * 255.0).round(),
            g: ((g + m) * 255.0).round(),
            b: ((b + m) * 255.0).round(),
            a: self.a,
        }
    }
}

impl fmt::Display for Hsla {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsla({}, {}%, {}%, {})", self.h, self.s, self.l, self.a)
    }
}

// ===== Color =====

/// A fill colour
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    Rgba(Rgba),
    Hsla(Hsla),
}

impl Color {
    /// Parse a CSS-style colour
    ///
    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r,g,b)`,
    /// `rgba(r,g,b,a)`, `hsl(h,s%,l%)`, `hsla(h,s%,l%,a)` and the names
    /// `white`, `black` and `transparent`.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim().to_ascii_lowercase();
        let invalid = || SpectrumError::InvalidColor(input.to_string());

        match s.as_str() {
            "white" => return Ok(Self::Rgba(Rgba::rgb(255.0, 255.0, 255.0))),
            "black" => return Ok(Self::Rgba(Rgba::rgb(0.0, 0.0, 0.0))),
            "transparent" => return Ok(Self::Rgba(Rgba::TRANSPARENT)),
            _ => {}
        }

        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).map(Self::Rgba).ok_or_else(invalid);
        }

        let (name, args) = s
            .strip_suffix(')')
            .and_then(|body| body.split_once('('))
            .ok_or_else(invalid)?;
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();

        let number = |part: &&str| -> Result<f64> {
            part.trim_end_matches('%')
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(invalid)
        };

        match (name.trim(), parts.as_slice()) {
            ("rgb", [r, g, b]) => Ok(Self::Rgba(Rgba::rgb(number(r)?, number(g)?, number(b)?))),
            ("rgba", [r, g, b, a]) => Ok(Self::Rgba(
                Rgba::rgb(number(r)?, number(g)?, number(b)?).with_alpha(number(a)?),
            )),
            ("hsl", [h, sat, l]) => Ok(Self::Hsla(Hsla::new(
                number(h)?,
                number(sat)?,
                number(l)?,
                1.0,
            ))),
            ("hsla", [h, sat, l, a]) => Ok(Self::Hsla(Hsla::new(
                number(h)?,
                number(sat)?,
                number(l)?,
                number(a)?,
            ))),
            _ => Err(invalid()),
        }
    }

    /// RGB form of this colour
    pub fn to_rgba(self) -> Rgba {
        match self {
            Self::Rgba(rgba) => rgba,
            Self::Hsla(hsla) => hsla.to_rgba(),
        }
    }

    /// Alpha component
    pub fn alpha(self) -> f64 {
        match self {
            Self::Rgba(rgba) => rgba.a,
            Self::Hsla(hsla) => hsla.a,
        }
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok().map(f64::from);
    let nibble = |i: usize| {
        u8::from_str_radix(hex.get(i..=i)?, 16)
            .ok()
            .map(|v| f64::from(v * 17))
    };

    match hex.len() {
        3 => Some(Rgba::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        6 => Some(Rgba::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba::rgb(byte(0)?, byte(2)?, byte(4)?).with_alpha(byte(6)? / 255.0)),
        _ => None,
    }
}

impl FromStr for Color {
    type Err = SpectrumError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Rgba> for Color {
    fn from(rgba: Rgba) -> Self {
        Self::Rgba(rgba)
    }
}

impl From<Hsla> for Color {
    fn from(hsla: Hsla) -> Self {
        Self::Hsla(hsla)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgba(rgba) => rgba.fmt(f),
            Self::Hsla(hsla) => hsla.fmt(f),
        }
    }
}
