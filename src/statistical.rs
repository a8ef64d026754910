use crate::model::performance::{MIN_NOTE_DURATION, Note};
use std::f64::consts::TAU;

/// Velocity standard deviation per unit of the velocity parameter.
const VELOCITY_SPREAD: f64 = 20.0;
/// Timing standard deviation (seconds) per unit of the timing parameter.
const TIMING_SPREAD: f64 = 0.05;
/// Notes above this pitch are played a little brighter.
const BRIGHT_PITCH: u8 = 72;
const BRIGHT_BIAS: f64 = 3.0;

/// Parameters used when a generated chunk has to be humanized statistically instead.
pub const FALLBACK_VELOCITY_AMOUNT: f64 = 0.3;
pub const FALLBACK_TIMING_AMOUNT: f64 = 0.1;

/// Gaussian velocity and timing jitter applied note by note.
#[derive(Debug, Clone)]
pub struct StatisticalHumanizer {
    rng: fastrand::Rng,
}

impl Default for StatisticalHumanizer {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticalHumanizer {
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Perturb a single note in place.
    ///
    /// The velocity stays within 1..=127 and the note keeps at least [`MIN_NOTE_DURATION`]
    /// regardless of how large the noise is.
    pub fn humanize(&mut self, note: &mut Note, velocity_amount: f64, timing_amount: f64) {
        let velocity_noise = self.gauss(velocity_amount * VELOCITY_SPREAD);
        let pitch_bias = if note.pitch > BRIGHT_PITCH {
            BRIGHT_BIAS
        } else {
            0.0
        };
        let velocity = (note.velocity as f64 + velocity_noise + pitch_bias).round();
        note.velocity = velocity.clamp(1.0, 127.0) as u8;

        // one draw shared by start and end so the duration survives the shift
        let timing_noise = self.gauss(timing_amount * TIMING_SPREAD);
        let start = (note.start + timing_noise).max(0.0);
        let end = (note.end + timing_noise).max(start + MIN_NOTE_DURATION);
        note.start = start;
        note.end = end;
    }

    pub fn humanize_all<'a, I>(&mut self, notes: I, velocity_amount: f64, timing_amount: f64)
    where
        I: IntoIterator<Item = &'a mut Note>,
    {
        for note in notes {
            self.humanize(note, velocity_amount, timing_amount);
        }
    }

    /// Zero-mean normal sample (Box-Muller).
    fn gauss(&mut self, std_dev: f64) -> f64 {
        if std_dev <= 0.0 || !std_dev.is_finite() {
            return 0.0;
        }

        let u1 = 1.0 - self.rng.f64();
        let u2 = self.rng.f64();
        std_dev * (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
    }
}
