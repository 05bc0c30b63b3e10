//! Platform-agnostic media source traits
//!
//! The engine owns exactly one [`MediaSource`] at a time and obtains new ones
//! from a [`SourceLoader`] whenever the requested URL changes.

use crate::error::Result;
use crate::types::TimeRange;
use std::time::Duration;

/// Decodable media source
///
/// Implementors provide decoded audio at the output sample rate and seeking.
pub trait MediaSource: Send {
    /// Read next chunk of audio samples
    ///
    /// Samples are interleaved stereo f32 in [-1.0, 1.0] range.
    ///
    /// # Returns
    /// * `Ok(n)` - Number of samples read (0 = end of media)
    /// * `Err(_)` - Decoding error
    fn read_samples(&mut self, buffer: &mut [f32]) -> Result<usize>;

    /// Seek to position from the start of the media
    fn seek(&mut self, position: Duration) -> Result<()>;

    /// Total duration, `None` while unknown
    fn duration(&self) -> Option<Duration>;

    /// Current read position
    fn position(&self) -> Duration;

    /// No more samples are available
    fn is_finished(&self) -> bool;

    /// Ranges that can be played without further decoding or I/O
    ///
    /// Local sources report the span from the start to the read head.
    fn buffered(&self) -> Vec<TimeRange> {
        let end = self.position().as_secs_f64();
        if end > 0.0 {
            vec![TimeRange { start: 0.0, end }]
        } else {
            Vec::new()
        }
    }

    /// Reset to beginning of media
    fn reset(&mut self) -> Result<()> {
        self.seek(Duration::ZERO)
    }
}

/// Opens media sources for track URLs
pub trait SourceLoader: Send + Sync {
    /// Open `url`, decoding to `sample_rate`
    fn open(&self, url: &str, sample_rate: u32) -> Result<Box<dyn MediaSource>>;
}

impl<F> SourceLoader for F
where
    F: Fn(&str, u32) -> Result<Box<dyn MediaSource>> + Send + Sync,
{
    fn open(&self, url: &str, sample_rate: u32) -> Result<Box<dyn MediaSource>> {
        self(url, sample_rate)
    }
}
