//! Encore - Spectrum Renderer
//!
//! Draws a frequency snapshot as stacked blocks, either as thin classic
//! bars or as a grid of square cells.
//!
//! The renderer never touches audio. Callers hand it byte magnitudes (as
//! produced by `encore_playback::Analyser::byte_frequency_data`) and a
//! [`Surface`] to paint on.
//!
//! # Example
//!
//! ```rust
//! use encore_spectrum::{BlockBars, BlockBarsOptions, RecordingSurface};
//!
//! let mut bars = BlockBars::new(&BlockBarsOptions {
//!     square: true,
//!     bg_clear: Some("#0b1020".into()),
//!     palette: vec!["#ff4d4f".into(), "#22c55e".into(), "#3b82f6".into()],
//!     ..BlockBarsOptions::default()
//! })
//! .unwrap();
//!
//! let spectrum = [180u8; 512];
//! let mut surface = RecordingSurface::new();
//! bars.draw(&mut surface, &spectrum, 320.0, 180.0);
//! assert!(surface.rects().count() > 0);
//! ```

pub mod color;
pub mod error;
pub mod layout;
pub mod options;
pub mod render;
pub mod surface;

pub use color::{Color, Hsla, Rgba};
pub use error::{Result, SpectrumError};
pub use layout::Layout;
pub use options::{BlockBarsOptions, Fill, PaletteMode, ResolvedOptions};
pub use render::{draw_block_bars, sample_palette, BlockBars};
pub use surface::{DrawOp, RecordingSurface, Rect, Surface};
