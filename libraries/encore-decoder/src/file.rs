//! Local file media source using the Symphonia decoder
//!
//! Packets are decoded on demand as the engine pulls audio, so opening a
//! file only costs a probe. Every sample format Symphonia produces is
//! normalized to f32 through one generic interleaving helper; mono is
//! duplicated to both channels and anything wider keeps its first two
//! channels.
//!
//! Output is always interleaved stereo at the rate requested when the
//! source was opened. Files at a different rate go through a streaming
//! sinc resampler.

use crate::error::{DecodeError, Result};
use crate::resample::StreamResampler;
use encore_playback::{MediaSource, Result as PlaybackResult};
use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use symphonia::core::units::TimeBase;

const CHANNELS: usize = 2;

/// Streaming decoder for a file on disk
pub struct FileSource {
    path: PathBuf,
    source_sample_rate: u32,
    target_sample_rate: u32,
    channels: u16,

    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    time_base: TimeBase,

    // Decoded interleaved stereo at the target rate
    buffer: VecDeque<f32>,
    resampler: Option<StreamResampler>,

    // Position of the last seek plus frames handed out since
    origin: Duration,
    frames_read: u64,
    duration: Option<Duration>,

    /// Decoded audio before this timestamp is discarded (accurate seek)
    skip_until: Option<u64>,
    is_eof: bool,
}

impl FileSource {
    /// Open `path` for playback at `target_sample_rate`
    ///
    /// Only probes the container and sets up the codec; no audio is decoded
    /// until the first read.
    pub fn open(path: impl AsRef<Path>, target_sample_rate: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let format_reader = probe(&path)?;

        let track = format_reader.default_track().ok_or(DecodeError::NoTrack)?;
        let params = track.codec_params.clone();
        let track_id = track.id;

        let source_sample_rate = params.sample_rate.unwrap_or(44100);
        let channels = params.channels.map_or(2, |c| c.count()) as u16;
        let time_base = params
            .time_base
            .unwrap_or_else(|| TimeBase::new(1, source_sample_rate));
        let duration = duration_of(&params);

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Codec(e.to_string()))?;

        let resampler = if source_sample_rate == target_sample_rate {
            None
        } else {
            Some(StreamResampler::new(source_sample_rate, target_sample_rate)?)
        };

        tracing::debug!(
            path = %path.display(),
            source_rate = source_sample_rate,
            target_rate = target_sample_rate,
            channels,
            duration = ?duration,
            resampling = resampler.is_some(),
            "Opened media source"
        );

        Ok(Self {
            path,
            source_sample_rate,
            target_sample_rate,
            channels,
            format_reader,
            decoder,
            track_id,
            time_base,
            buffer: VecDeque::new(),
            resampler,
            origin: Duration::ZERO,
            frames_read: 0,
            duration,
            skip_until: None,
            is_eof: false,
        })
    }

    /// Decode the next packet into the buffer
    ///
    /// Returns `false` once the stream is exhausted.
    fn decode_next_packet(&mut self) -> Result<bool> {
        if self.is_eof {
            return Ok(false);
        }

        let packet = match self.format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.finish()?;
                return Ok(false);
            }
            Err(SymphoniaError::ResetRequired) => {
                self.finish()?;
                return Ok(false);
            }
            Err(e) => return Err(DecodeError::Read(e.to_string())),
        };

        if packet.track_id() != self.track_id {
            return Ok(true);
        }

        let decoded = match self.decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!(path = %self.path.display(), error = e, "Skipping corrupt packet");
                return Ok(true);
            }
            Err(e) => return Err(DecodeError::Codec(e.to_string())),
        };
        let mut samples = to_stereo_f32(decoded);

        if let Some(required) = self.skip_until {
            let start = packet.ts();
            if start.saturating_add(packet.dur()) <= required {
                return Ok(true);
            }
            if start < required {
                let skip = self.seconds(required) - self.seconds(start);
                let frames = (skip * f64::from(self.source_sample_rate)).round() as usize;
                samples.drain(..(frames * CHANNELS).min(samples.len()));
            }
            self.skip_until = None;
        }

        match self.resampler.as_mut() {
            Some(resampler) => {
                let mut converted = Vec::with_capacity(samples.len());
                resampler.push(&samples, &mut converted)?;
                self.buffer.extend(converted);
            }
            None => self.buffer.extend(samples),
        }

        Ok(true)
    }

    fn finish(&mut self) -> Result<()> {
        self.is_eof = true;
        if let Some(resampler) = self.resampler.as_mut() {
            let mut tail = Vec::new();
            resampler.flush(&mut tail)?;
            self.buffer.extend(tail);
        }
        Ok(())
    }

    fn seconds(&self, ts: u64) -> f64 {
        let time = self.time_base.calc_time(ts);
        time.seconds as f64 + time.frac
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        self.buffer.clear();
        self.decoder.reset();
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
        self.skip_until = None;
        self.frames_read = 0;
        self.is_eof = false;

        if let Some(duration) = self.duration {
            if position >= duration {
                self.origin = duration;
                self.is_eof = true;
                return Ok(());
            }
        }

        let seeked = self
            .format_reader
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: self.time_base.calc_timestamp(position.into()),
                    track_id: self.track_id,
                },
            )
            .map_err(|e| DecodeError::Seek(e.to_string()))?;

        if seeked.actual_ts < seeked.required_ts {
            self.skip_until = Some(seeked.required_ts);
        }
        self.origin = position;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Output sample rate
    pub fn sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Sample rate of the file itself
    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }

    /// Channel count of the file (output is always stereo)
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl MediaSource for FileSource {
    fn read_samples(&mut self, output: &mut [f32]) -> PlaybackResult<usize> {
        let wanted = output.len() - output.len() % CHANNELS;

        while self.buffer.len() < wanted && !self.is_eof {
            self.decode_next_packet()?;
        }

        let available = self.buffer.len().min(wanted);
        for (slot, sample) in output.iter_mut().zip(self.buffer.drain(..available)) {
            *slot = sample;
        }
        output[available..].fill(0.0);

        self.frames_read += (available / CHANNELS) as u64;
        Ok(available)
    }

    fn seek(&mut self, position: Duration) -> PlaybackResult<()> {
        self.seek_to(position)?;
        Ok(())
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn position(&self) -> Duration {
        let played =
            Duration::from_secs_f64(self.frames_read as f64 / f64::from(self.target_sample_rate));
        self.origin + played
    }

    fn is_finished(&self) -> bool {
        self.is_eof && self.buffer.is_empty()
    }
}

// ===== Probing =====

fn probe(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::Probe(e.to_string()))?;

    Ok(probed.format)
}

fn duration_of(params: &CodecParameters) -> Option<Duration> {
    let frames = params.n_frames?;
    let sample_rate = params.sample_rate.filter(|&rate| rate > 0)?;
    Some(Duration::from_secs_f64(frames as f64 / f64::from(sample_rate)))
}

/// Read the duration of a file from its container without decoding
///
/// `None` when the container does not declare a frame count.
pub fn probe_duration(path: impl AsRef<Path>) -> Result<Option<Duration>> {
    let format_reader = probe(path.as_ref())?;
    let track = format_reader.default_track().ok_or(DecodeError::NoTrack)?;
    Ok(duration_of(&track.codec_params))
}

// ===== Sample conversion =====

/// Interleave a planar buffer to stereo f32, duplicating mono
fn interleave_to_stereo_f32<T, F>(buf: &AudioBuffer<T>, normalize: F) -> Vec<f32>
where
    T: Sample,
    F: Fn(T) -> f32,
{
    let frames = buf.frames();
    let left = buf.chan(0);
    let right = if buf.spec().channels.count() > 1 {
        buf.chan(1)
    } else {
        left
    };

    let mut output = Vec::with_capacity(frames * CHANNELS);
    for (&l, &r) in left.iter().zip(right).take(frames) {
        output.push(normalize(l));
        output.push(normalize(r));
    }
    output
}

/// Normalize any Symphonia sample format to interleaved stereo f32
fn to_stereo_f32(decoded: AudioBufferRef<'_>) -> Vec<f32> {
    match decoded {
        AudioBufferRef::F32(buf) => interleave_to_stereo_f32(&buf, |s| s),
        AudioBufferRef::F64(buf) => interleave_to_stereo_f32(&buf, |s| s as f32),

        AudioBufferRef::S8(buf) => interleave_to_stereo_f32(&buf, |s| s as f32 / i8::MAX as f32),
        AudioBufferRef::S16(buf) => {
            interleave_to_stereo_f32(&buf, |s| s as f32 / i16::MAX as f32)
        }
        AudioBufferRef::S24(buf) => {
            interleave_to_stereo_f32(&buf, |s| s.inner() as f32 / 8388607.0)
        }
        AudioBufferRef::S32(buf) => {
            interleave_to_stereo_f32(&buf, |s| s as f32 / i32::MAX as f32)
        }

        AudioBufferRef::U8(buf) => {
            interleave_to_stereo_f32(&buf, |s| (s as f32 / u8::MAX as f32) * 2.0 - 1.0)
        }
        AudioBufferRef::U16(buf) => {
            interleave_to_stereo_f32(&buf, |s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0)
        }
        AudioBufferRef::U24(buf) => {
            interleave_to_stereo_f32(&buf, |s| (s.inner() as f32 / 16777215.0) * 2.0 - 1.0)
        }
        AudioBufferRef::U32(buf) => {
            interleave_to_stereo_f32(&buf, |s| (s as f32 / u32::MAX as f32) * 2.0 - 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_source_implements_media_source() {
        fn assert_media_source<T: MediaSource>() {}
        assert_media_source::<FileSource>();
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let result = FileSource::open("/definitely/not/here.wav", 48000);
        assert!(matches!(result, Err(DecodeError::Open(_))));
    }
}
