//! Output pump
//!
//! Without a device the host pulls audio itself. Every block rendered moves
//! the engine clock, which drives fades, preview boundaries and ticks.

use encore_playback::PreviewEngine;
use std::time::Duration;

/// How fast blocks are pulled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// One block per block duration of wall time
    RealTime,
    /// As fast as the decoder allows
    Fast,
}

/// Pulls fixed-size blocks from the engine
pub struct Pump {
    engine: PreviewEngine,
    buffer: Vec<f32>,
    block_duration: Duration,
    pace: Pace,
}

impl Pump {
    pub fn new(engine: PreviewEngine, sample_rate: u32, block_frames: usize, pace: Pace) -> Self {
        let block_frames = block_frames.max(1);
        let block_duration =
            Duration::from_secs_f64(block_frames as f64 / f64::from(sample_rate.max(1)));
        Self {
            engine,
            buffer: vec![0.0; block_frames * 2],
            block_duration,
            pace,
        }
    }

    pub fn block_duration(&self) -> Duration {
        self.block_duration
    }

    /// Render one block and return it
    pub fn step(&mut self) -> &[f32] {
        self.engine.render(&mut self.buffer);
        &self.buffer
    }

    /// Render audio until `done` returns true or `limit` of audio has played
    ///
    /// Returns the amount of audio rendered.
    pub async fn run_until<F>(&mut self, mut done: F, limit: Option<Duration>) -> Duration
    where
        F: FnMut() -> bool,
    {
        let mut interval = tokio::time::interval(self.block_duration);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);
        let mut rendered = Duration::ZERO;

        while !done() {
            if limit.is_some_and(|limit| rendered >= limit) {
                tracing::debug!(?rendered, "Render limit reached");
                break;
            }
            match self.pace {
                Pace::RealTime => {
                    interval.tick().await;
                }
                Pace::Fast => tokio::task::yield_now().await,
            }
            self.step();
            rendered += self.block_duration;
        }
        rendered
    }

    /// Render exactly `duration` of audio, ignoring pace
    pub fn advance(&mut self, duration: Duration) {
        let blocks = (duration.as_secs_f64() / self.block_duration.as_secs_f64()).ceil() as usize;
        for _ in 0..blocks {
            self.step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_playback::{HeadlessOutput, MediaSource, PlayRequest, SourceLoader};
    use std::sync::Arc;

    struct Silence {
        frames: u64,
        rate: u32,
    }

    impl MediaSource for Silence {
        fn read_samples(&mut self, buffer: &mut [f32]) -> encore_playback::Result<usize> {
            buffer.fill(0.0);
            self.frames += (buffer.len() / 2) as u64;
            Ok(buffer.len())
        }

        fn seek(&mut self, position: Duration) -> encore_playback::Result<()> {
            self.frames = (position.as_secs_f64() * f64::from(self.rate)) as u64;
            Ok(())
        }

        fn duration(&self) -> Option<Duration> {
            Some(Duration::from_secs(60))
        }

        fn position(&self) -> Duration {
            Duration::from_secs_f64(self.frames as f64 / f64::from(self.rate))
        }

        fn is_finished(&self) -> bool {
            false
        }
    }

    struct SilenceLoader;

    impl SourceLoader for SilenceLoader {
        fn open(
            &self,
            _url: &str,
            sample_rate: u32,
        ) -> encore_playback::Result<Box<dyn MediaSource>> {
            Ok(Box::new(Silence {
                frames: 0,
                rate: sample_rate,
            }))
        }
    }

    fn engine() -> PreviewEngine {
        PreviewEngine::new(
            Arc::new(HeadlessOutput::new(48000)),
            Arc::new(SilenceLoader),
        )
    }

    #[tokio::test]
    async fn fast_pump_stops_at_limit() {
        let engine = engine();
        engine.play(PlayRequest::full("a", "a")).await.unwrap();
        let mut pump = Pump::new(engine.clone(), 48000, 480, Pace::Fast);

        let rendered = pump
            .run_until(|| false, Some(Duration::from_millis(100)))
            .await;
        assert!(rendered >= Duration::from_millis(100));
        assert!(rendered < Duration::from_millis(110));
        assert!((engine.state().current_time - 0.1).abs() < 0.01);
    }

    #[tokio::test]
    async fn pump_stops_when_done() {
        let engine = engine();
        engine
            .play(PlayRequest::preview("a", "a", 1.0, 1.2))
            .await
            .unwrap();
        let mut pump = Pump::new(engine.clone(), 48000, 1024, Pace::Fast);

        let watched = engine.clone();
        pump.run_until(move || watched.state().paused, Some(Duration::from_secs(5)))
            .await;
        assert!(engine.state().paused);
        assert!(engine.state().current_time <= 1.2);
    }

    #[tokio::test(start_paused = true)]
    async fn real_time_pump_follows_the_clock() {
        let engine = engine();
        let mut pump = Pump::new(engine, 48000, 4800, Pace::RealTime);
        let start = tokio::time::Instant::now();
        pump.run_until(|| false, Some(Duration::from_millis(500)))
            .await;
        // First tick completes immediately
        assert!(start.elapsed() >= Duration::from_millis(400));
    }
}
