use crate::model::performance::TrackId;
use log::{info, warn};
use std::fmt;

/// A non-fatal problem met while humanizing.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub track: Option<TrackId>,
    /// Zero-based chunk index within the track, when the warning concerns one chunk.
    pub chunk: Option<usize>,
    pub message: String,
}

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            track: None,
            chunk: None,
            message: message.into(),
        }
    }

    pub fn for_chunk(track: TrackId, chunk: usize, message: impl Into<String>) -> Self {
        Self {
            track: Some(track),
            chunk: Some(chunk),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.track, self.chunk) {
            (Some(track), Some(chunk)) => {
                write!(f, "Track {}, chunk {}: {}", track, chunk + 1, self.message)
            }
            (Some(track), None) => write!(f, "Track {}: {}", track, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Where progress and warnings go while a run is in flight.
pub trait Reporter {
    /// Overall completion in `0.0..=1.0`.
    fn progress(&mut self, fraction: f64);

    fn warning(&mut self, warning: Warning);
}

/// Keeps reported progress clamped and non-decreasing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressState {
    fraction: f64,
}

impl ProgressState {
    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Record `fraction` and forward the resulting value to `reporter`.
    pub fn advance(&mut self, fraction: f64, reporter: &mut dyn Reporter) {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.fraction = self.fraction.max(fraction);
        reporter.progress(self.fraction);
    }

    pub fn finish(&mut self, reporter: &mut dyn Reporter) {
        if self.fraction < 1.0 {
            self.advance(1.0, reporter);
        }
    }
}

/// Sends everything to the `log` facade.
#[derive(Debug, Default)]
pub struct LogReporter {
    last_percent: Option<u32>,
    warnings: usize,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }
}

impl Reporter for LogReporter {
    fn progress(&mut self, fraction: f64) {
        let percent = (fraction * 100.0).floor() as u32;
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            info!("Progress: {:>3}%", percent);
        }
    }

    fn warning(&mut self, warning: Warning) {
        self.warnings += 1;
        warn!("{}..!", warning);
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Collects everything reported, for assertions.
    #[derive(Debug, Default)]
    pub(crate) struct Recorder {
        pub progress: Vec<f64>,
        pub warnings: Vec<Warning>,
    }

    impl Reporter for Recorder {
        fn progress(&mut self, fraction: f64) {
            self.progress.push(fraction);
        }

        fn warning(&mut self, warning: Warning) {
            self.warnings.push(warning);
        }
    }

    #[test]
    fn progress_never_goes_backwards() {
        let mut recorder = Recorder::default();
        let mut state = ProgressState::default();

        state.advance(0.5, &mut recorder);
        state.advance(0.25, &mut recorder);
        state.advance(1.5, &mut recorder);
        state.finish(&mut recorder);

        assert_eq!(recorder.progress, vec![0.5, 0.5, 1.0]);
        assert_eq!(state.fraction(), 1.0);
    }

    #[test]
    fn warnings_render_one_based_chunks() {
        let warning = Warning::for_chunk(TrackId(3), 0, "timed out");
        assert_eq!(warning.to_string(), "Track #3, chunk 1: timed out");
        assert_eq!(Warning::new("nothing to do").to_string(), "nothing to do");
    }
}
