//! Gain automation
//!
//! A single automated gain parameter on the output clock. Only one linear
//! ramp can be pending; scheduling a new one first cancels the old ramp and
//! holds the value it had reached, so consecutive fades never jump.

/// Pending linear ramp
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ramp {
    start_time: f64,
    start_value: f32,
    end_time: f64,
    target: f32,
}

impl Ramp {
    fn value_at(&self, time: f64) -> f32 {
        if time >= self.end_time {
            return self.target;
        }
        if time <= self.start_time {
            return self.start_value;
        }
        let progress = ((time - self.start_time) / (self.end_time - self.start_time)) as f32;
        self.start_value + (self.target - self.start_value) * progress
    }
}

/// Automated gain parameter in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct GainSchedule {
    value: f32,
    ramp: Option<Ramp>,
}

impl GainSchedule {
    pub fn new(value: f32) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
            ramp: None,
        }
    }

    /// Gain at output time `time`
    pub fn value_at(&self, time: f64) -> f32 {
        self.ramp.map_or(self.value, |ramp| ramp.value_at(time))
    }

    /// A ramp is scheduled and has not finished at `time`
    pub fn is_ramping(&self, time: f64) -> bool {
        self.ramp.is_some_and(|ramp| time < ramp.end_time)
    }

    /// Cancel any scheduled ramp, holding the value reached at `time`
    pub fn cancel_and_hold(&mut self, time: f64) {
        self.value = self.value_at(time);
        self.ramp = None;
    }

    /// Cancel automation and jump to `value`
    ///
    /// Only used at a hard stop or a source switch.
    pub fn set_value(&mut self, value: f32) {
        self.value = value.clamp(0.0, 1.0);
        self.ramp = None;
    }

    /// Ramp from the current value at `now` to `target` over `duration` seconds
    pub fn ramp_to(&mut self, now: f64, target: f32, duration: f64) {
        self.cancel_and_hold(now);
        let target = target.clamp(0.0, 1.0);
        if duration <= 0.0 {
            self.value = target;
            return;
        }
        self.ramp = Some(Ramp {
            start_time: now,
            start_value: self.value,
            end_time: now + duration,
            target,
        });
    }

    /// Multiply interleaved stereo frames by the gain curve starting at `start_time`
    pub fn apply(&mut self, buffer: &mut [f32], start_time: f64, sample_rate: u32) {
        let Some(ramp) = self.ramp else {
            let gain = self.value;
            if gain == 0.0 {
                buffer.fill(0.0);
            } else if gain != 1.0 {
                for sample in buffer.iter_mut() {
                    *sample *= gain;
                }
            }
            return;
        };

        let dt = 1.0 / f64::from(sample_rate.max(1));
        for (frame, samples) in buffer.chunks_mut(2).enumerate() {
            let gain = ramp.value_at(start_time + frame as f64 * dt);
            for sample in samples {
                *sample *= gain;
            }
        }

        // Collapse a finished ramp into a constant
        let end_time = start_time + (buffer.len() / 2) as f64 * dt;
        if end_time >= ramp.end_time {
            self.value = ramp.target;
            self.ramp = None;
        }
    }
}

impl Default for GainSchedule {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_interpolates_linearly() {
        let mut gain = GainSchedule::new(0.0);
        gain.ramp_to(1.0, 1.0, 0.1);
        assert_eq!(gain.value_at(1.0), 0.0);
        assert!((gain.value_at(1.05) - 0.5).abs() < 1e-4);
        assert_eq!(gain.value_at(1.1), 1.0);
        assert_eq!(gain.value_at(5.0), 1.0);
    }

    #[test]
    fn rescheduling_starts_from_current_value() {
        let mut gain = GainSchedule::new(0.0);
        gain.ramp_to(0.0, 1.0, 0.12);
        let mid = gain.value_at(0.06);

        gain.ramp_to(0.06, 0.0, 0.14);
        assert!((gain.value_at(0.06) - mid).abs() < 1e-6);
        assert_eq!(gain.value_at(0.2), 0.0);
    }

    #[test]
    fn zero_duration_ramp_jumps() {
        let mut gain = GainSchedule::new(0.3);
        gain.ramp_to(2.0, 0.8, 0.0);
        assert_eq!(gain.value_at(2.0), 0.8);
        assert!(!gain.is_ramping(2.0));
    }

    #[test]
    fn apply_collapses_finished_ramp() {
        let mut gain = GainSchedule::new(0.0);
        gain.ramp_to(0.0, 1.0, 0.001);

        let mut buffer = vec![1.0f32; 2 * 480];
        gain.apply(&mut buffer, 0.0, 48000);

        assert_eq!(buffer[0], 0.0);
        assert_eq!(*buffer.last().unwrap(), 1.0);
        assert!(!gain.is_ramping(0.01));
        assert_eq!(gain.value_at(0.01), 1.0);
    }

    #[test]
    fn apply_zero_gain_silences() {
        let mut gain = GainSchedule::new(0.0);
        let mut buffer = vec![0.7f32; 64];
        gain.apply(&mut buffer, 0.0, 44100);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }
}
