//! Output context abstraction
//!
//! Models the platform audio context: a sample rate, a running/suspended
//! state, and a session identity that changes whenever the platform restarts
//! the device. Device backends implement [`OutputContext`] and pull audio via
//! `PreviewEngine::render`.

use crate::error::{PlaybackError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Output context state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputState {
    Suspended,
    Running,
}

/// Platform output context
#[async_trait]
pub trait OutputContext: Send + Sync {
    /// Output sample rate (Hz)
    fn sample_rate(&self) -> u32;

    fn state(&self) -> OutputState;

    /// Identity of the current device session
    ///
    /// Changes when the platform tears down and recreates the device.
    fn session(&self) -> u64;

    /// Start or restart output
    ///
    /// Fails with `PlaybackError::AutoplayBlocked` when the platform requires
    /// a user gesture first.
    async fn resume(&self) -> Result<()>;
}

/// Output context without a device
///
/// Audio is pulled by the host (tests, offline rendering, the CLI clock).
/// Optionally enforces an autoplay gate: `resume()` is rejected until
/// [`HeadlessOutput::grant_gesture`] is called.
#[derive(Debug)]
pub struct HeadlessOutput {
    sample_rate: AtomicU32,
    state: Mutex<OutputState>,
    session: AtomicU64,
    gesture_granted: AtomicBool,
}

impl HeadlessOutput {
    /// Suspended output that resumes freely
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: AtomicU32::new(sample_rate),
            state: Mutex::new(OutputState::Suspended),
            session: AtomicU64::new(1),
            gesture_granted: AtomicBool::new(true),
        }
    }

    /// Suspended output that rejects `resume()` until a gesture is granted
    pub fn gesture_gated(sample_rate: u32) -> Self {
        let output = Self::new(sample_rate);
        output.gesture_granted.store(false, Ordering::SeqCst);
        output
    }

    /// Record a user gesture so later `resume()` calls succeed
    pub fn grant_gesture(&self) {
        self.gesture_granted.store(true, Ordering::SeqCst);
    }

    /// Suspend output (e.g. the platform interrupted audio)
    pub fn suspend(&self) {
        *self.state.lock() = OutputState::Suspended;
    }

    /// Simulate a device restart at a (possibly different) sample rate
    ///
    /// Starts a new session and leaves the context suspended.
    pub fn restart(&self, sample_rate: u32) {
        self.sample_rate.store(sample_rate, Ordering::SeqCst);
        self.session.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = OutputState::Suspended;
        tracing::debug!(sample_rate, "Headless output restarted");
    }
}

#[async_trait]
impl OutputContext for HeadlessOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::SeqCst)
    }

    fn state(&self) -> OutputState {
        *self.state.lock()
    }

    fn session(&self) -> u64 {
        self.session.load(Ordering::SeqCst)
    }

    async fn resume(&self) -> Result<()> {
        if !self.gesture_granted.load(Ordering::SeqCst) {
            return Err(PlaybackError::AutoplayBlocked(
                "resume requires a user gesture".into(),
            ));
        }
        *self.state.lock() = OutputState::Running;
        Ok(())
    }
}
