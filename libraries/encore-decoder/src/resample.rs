//! Streaming stereo sample-rate conversion
//!
//! Decoded packets rarely line up with the resampler's fixed input chunk,
//! so input frames are queued per channel until a whole chunk is available.
//! The tail is pushed through at end of stream and the output is trimmed
//! to the exact converted length.

use crate::error::{DecodeError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

const CHANNELS: usize = 2;

pub(crate) struct StreamResampler {
    inner: SincFixedIn<f32>,
    ratio: f64,
    pending: [Vec<f32>; CHANNELS],
    /// Output frames still to discard (filter delay)
    delay: usize,
    frames_in: u64,
    frames_out: u64,
}

impl StreamResampler {
    pub(crate) fn new(source_rate: u32, target_rate: u32) -> Result<Self> {
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        // 0.1 s of input per chunk
        let chunk_frames = (source_rate as usize / 10).max(1);
        let ratio = f64::from(target_rate) / f64::from(source_rate);

        let inner = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_frames, CHANNELS)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        let delay = inner.output_delay();

        Ok(Self {
            inner,
            ratio,
            pending: [Vec::new(), Vec::new()],
            delay,
            frames_in: 0,
            frames_out: 0,
        })
    }

    /// Queue interleaved stereo input, appending any converted output
    pub(crate) fn push(&mut self, interleaved: &[f32], out: &mut Vec<f32>) -> Result<()> {
        for frame in interleaved.chunks_exact(CHANNELS) {
            self.pending[0].push(frame[0]);
            self.pending[1].push(frame[1]);
        }
        self.frames_in += (interleaved.len() / CHANNELS) as u64;

        loop {
            let needed = self.inner.input_frames_next();
            if self.pending[0].len() < needed {
                return Ok(());
            }
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|channel| channel.drain(..needed).collect())
                .collect();
            let converted = self
                .inner
                .process(&chunk, None)
                .map_err(|e| DecodeError::Resample(e.to_string()))?;
            self.emit(&converted, out, None);
        }
    }

    /// Convert whatever is still queued at end of stream
    pub(crate) fn flush(&mut self, out: &mut Vec<f32>) -> Result<()> {
        let expected = (self.frames_in as f64 * self.ratio).round() as u64;

        if !self.pending[0].is_empty() {
            let chunk: Vec<Vec<f32>> = self.pending.iter_mut().map(std::mem::take).collect();
            let converted = self
                .inner
                .process_partial(Some(&chunk), None)
                .map_err(|e| DecodeError::Resample(e.to_string()))?;
            self.emit(&converted, out, Some(expected));
        }

        // Drain the filter delay
        while self.frames_out < expected {
            let converted = self
                .inner
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| DecodeError::Resample(e.to_string()))?;
            if converted.first().map_or(true, Vec::is_empty) {
                break;
            }
            self.emit(&converted, out, Some(expected));
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.inner.reset();
        self.pending.iter_mut().for_each(Vec::clear);
        self.delay = self.inner.output_delay();
        self.frames_in = 0;
        self.frames_out = 0;
    }

    fn emit(&mut self, converted: &[Vec<f32>], out: &mut Vec<f32>, limit: Option<u64>) {
        let (Some(left), Some(right)) = (converted.first(), converted.get(1)) else {
            return;
        };
        for (&l, &r) in left.iter().zip(right) {
            if self.delay > 0 {
                self.delay -= 1;
                continue;
            }
            if limit.is_some_and(|limit| self.frames_out >= limit) {
                return;
            }
            out.push(l);
            out.push(r);
            self.frames_out += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(source_rate: u32, target_rate: u32, frames: usize, packet: usize) -> Vec<f32> {
        let mut resampler = StreamResampler::new(source_rate, target_rate).unwrap();
        let input: Vec<f32> = (0..frames)
            .flat_map(|i| {
                let s = (i as f32 * 0.01).sin() * 0.5;
                [s, s]
            })
            .collect();

        let mut out = Vec::new();
        for chunk in input.chunks(packet * 2) {
            resampler.push(chunk, &mut out).unwrap();
        }
        resampler.flush(&mut out).unwrap();
        out
    }

    #[test]
    fn output_length_matches_ratio() {
        let out = convert(44100, 48000, 44100, 1152);
        assert_eq!(out.len(), 48000 * 2);
    }

    #[test]
    fn small_packets_are_queued_not_dropped() {
        let out = convert(48000, 44100, 24000, 100);
        assert_eq!(out.len(), 22050 * 2);
    }

    #[test]
    fn reset_clears_queued_input() {
        let mut resampler = StreamResampler::new(44100, 48000).unwrap();
        let mut out = Vec::new();
        resampler.push(&[0.1; 200], &mut out).unwrap();
        resampler.reset();

        resampler.flush(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
