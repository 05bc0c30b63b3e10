//! Playback resource graph
//!
//! The single audio pipeline shared by every playback request:
//!
//! ```text
//! source ──┬──> gain ──> output
//!          └──> analyser
//! ```
//!
//! Built once on first enable. When the output session changes the source
//! binding is rebuilt while the gain and analyser nodes survive.

use crate::analyser::Analyser;
use crate::config::EngineConfig;
use crate::gain::GainSchedule;
use crate::output::OutputContext;
use serde::{Deserialize, Serialize};

/// Construction counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Full graph constructions (at most one per engine)
    pub builds: u32,
    /// Source rebinds after an output session change
    pub rewires: u32,
}

/// Binding of the media source to an output session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceBinding {
    pub session: u64,
    pub sample_rate: u32,
}

/// Outcome of [`ResourceGraph::rebind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebind {
    Unchanged,
    /// New session, same rate; the source can keep decoding
    Rewired,
    /// New session at a different rate; the source must be reopened
    Resampled,
}

#[derive(Debug)]
pub struct ResourceGraph {
    binding: SourceBinding,
    gain: GainSchedule,
    analyser: Analyser,
    stats: GraphStats,
}

impl ResourceGraph {
    pub(crate) fn build(output: &dyn OutputContext, config: &EngineConfig) -> Self {
        let binding = SourceBinding {
            session: output.session(),
            sample_rate: output.sample_rate(),
        };
        tracing::debug!(
            session = binding.session,
            sample_rate = binding.sample_rate,
            fft_size = config.analyser_fft_size(),
            "Building playback resource graph"
        );

        Self {
            binding,
            gain: GainSchedule::new(0.0),
            analyser: Analyser::new(config),
            stats: GraphStats {
                builds: 1,
                rewires: 0,
            },
        }
    }

    /// Rebind the source if the output session changed
    pub(crate) fn rebind(&mut self, output: &dyn OutputContext) -> Rebind {
        let session = output.session();
        if session == self.binding.session {
            return Rebind::Unchanged;
        }

        let sample_rate = output.sample_rate();
        let resampled = sample_rate != self.binding.sample_rate;
        tracing::debug!(
            old_session = self.binding.session,
            session,
            sample_rate,
            "Output session changed; rewiring source"
        );

        self.binding = SourceBinding {
            session,
            sample_rate,
        };
        self.stats.rewires += 1;
        self.analyser.reset();

        if resampled {
            Rebind::Resampled
        } else {
            Rebind::Rewired
        }
    }

    pub fn binding(&self) -> SourceBinding {
        self.binding
    }

    pub fn sample_rate(&self) -> u32 {
        self.binding.sample_rate
    }

    pub fn gain(&self) -> &GainSchedule {
        &self.gain
    }

    pub(crate) fn gain_mut(&mut self) -> &mut GainSchedule {
        &mut self.gain
    }

    pub fn analyser(&self) -> &Analyser {
        &self.analyser
    }

    pub fn stats(&self) -> GraphStats {
        self.stats
    }

    /// Run one block through the graph: tap, then gain
    pub(crate) fn process(&mut self, block: &mut [f32], start_time: f64) {
        self.analyser.push_interleaved(block);
        self.gain.apply(block, start_time, self.binding.sample_rate);
    }
}
