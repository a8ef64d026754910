use crate::chunking::{DEFAULT_CHUNK_SIZE, chunk, chunk_count};
use crate::engine::GenerationBackend;
use crate::engine::pacing::{FixedDelay, Pacer};
use crate::model::performance::*;
use crate::prompt::{PerformerStyle, build_prompt, parse_response};
use crate::report::{ProgressState, Reporter, Warning};
use crate::statistical::{FALLBACK_TIMING_AMOUNT, FALLBACK_VELOCITY_AMOUNT, StatisticalHumanizer};
use log::{debug, info};
use std::sync::mpsc::Receiver;

pub enum ControlMsg {
    Stop,
}

/// What to do when a reply carries a different number of velocities than the chunk has notes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LengthPolicy {
    /// Apply velocities to the overlapping prefix and leave any remaining notes as they are.
    #[default]
    Partial,

    /// Treat any mismatch as a failed chunk.
    Strict,
}

impl LengthPolicy {
    /// Turn parsed reply values into the outcome for a chunk of `expected` notes.
    pub fn judge(&self, parsed: Vec<u32>, expected: usize) -> ChunkOutcome {
        if parsed.is_empty() {
            return ChunkOutcome::Failed("response contained no velocities".to_string());
        }

        if parsed.len() != expected {
            match self {
                LengthPolicy::Strict => {
                    return ChunkOutcome::Failed(format!(
                        "expected {} velocities but the response had {}",
                        expected,
                        parsed.len()
                    ));
                }
                LengthPolicy::Partial => debug!(
                    "Response had {} velocities for {} notes, applying the overlap..!",
                    parsed.len(),
                    expected
                ),
            }
        }

        ChunkOutcome::Applied(
            parsed
                .into_iter()
                .map(|velocity| velocity.clamp(1, 127) as u8)
                .collect(),
        )
    }
}

/// Result of one generation round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Applied(Vec<u8>),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub chunk_size: usize,
    pub performer: PerformerStyle,
    pub length_policy: LengthPolicy,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            performer: PerformerStyle::default(),
            length_policy: LengthPolicy::default(),
        }
    }
}

/// Write velocities positionally onto `notes`; returns how many notes were changed.
pub fn apply_velocities(notes: &mut [Note], velocities: &[u8]) -> usize {
    let applied = notes.len().min(velocities.len());
    for (note, &velocity) in notes.iter_mut().zip(velocities.iter()) {
        note.velocity = velocity.clamp(1, 127);
    }
    applied
}

/// Asks a language model for expressive velocities, one chunk of notes per request.
///
/// Every chunk ends up humanized: a failed request falls back to the statistical model.
pub struct LlmHumanizer<B: GenerationBackend> {
    backend: B,
    settings: LlmSettings,
    pacer: Box<dyn Pacer>,
    fallback: StatisticalHumanizer,
    control: Option<Receiver<ControlMsg>>,
}

impl<B: GenerationBackend> LlmHumanizer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            settings: LlmSettings::default(),
            pacer: Box::new(FixedDelay::default()),
            fallback: StatisticalHumanizer::new(),
            control: None,
        }
    }

    pub fn with_settings(mut self, settings: LlmSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_pacer(mut self, pacer: Box<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.fallback = StatisticalHumanizer::with_seed(seed);
        self
    }

    /// Checked between chunks; a `Stop` ends all further requests.
    pub fn with_control(mut self, control: Receiver<ControlMsg>) -> Self {
        self.control = Some(control);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn humanize(
        &mut self,
        performance: &mut Performance,
        api_key: &str,
        selection: &TrackSelection,
        reporter: &mut dyn Reporter,
    ) {
        let targets = performance.targets(selection);

        if targets.is_empty() {
            reporter.warning(Warning::new("No tracks were selected for humanization"));
            return;
        }

        let chunk_size = self.settings.chunk_size.max(1);
        let total_tracks = targets.len() as f64;
        let mut progress = ProgressState::default();
        let mut stopped = false;

        for (track_idx, id) in targets.iter().copied().enumerate() {
            let track = &mut performance.tracks[id.0];
            let label = track.label(id);
            let performer = self.settings.performer.describe(&label);
            let total_chunks = chunk_count(track.notes.len(), chunk_size);

            info!(
                "Track {}: generating velocities for {} notes in {} chunk(s)..!",
                label,
                track.notes.len(),
                total_chunks
            );

            for (chunk_idx, notes) in chunk(&mut track.notes, chunk_size).enumerate() {
                if !stopped && self.stop_requested() {
                    stopped = true;
                    reporter.warning(Warning::for_chunk(
                        id,
                        chunk_idx,
                        "Stopped, humanizing the remaining chunks statistically",
                    ));
                }

                if stopped {
                    self.fall_back(notes);
                } else {
                    self.pacer.before_request();
                    let outcome = self.request_chunk(api_key, &performer, notes);
                    let succeeded = matches!(outcome, ChunkOutcome::Applied(_));

                    match outcome {
                        ChunkOutcome::Applied(velocities) => {
                            let applied = apply_velocities(notes, &velocities);
                            debug!(
                                "Track {} chunk {}: applied {}/{} velocities..!",
                                id,
                                chunk_idx + 1,
                                applied,
                                notes.len()
                            );
                        }
                        ChunkOutcome::Failed(reason) => {
                            reporter.warning(Warning::for_chunk(
                                id,
                                chunk_idx,
                                format!(
                                    "{}, falling back to statistical humanization",
                                    reason
                                ),
                            ));
                            self.fall_back(notes);
                        }
                    }

                    self.pacer.after_request(succeeded);
                }

                let fraction = track_idx as f64 / total_tracks
                    + (chunk_idx + 1) as f64 / total_chunks as f64 * (1.0 / total_tracks);
                progress.advance(fraction, reporter);
            }
        }

        progress.finish(reporter);
    }

    fn request_chunk(&self, api_key: &str, performer: &str, notes: &[Note]) -> ChunkOutcome {
        let prompt = build_prompt(performer, notes);

        match self.backend.generate(api_key, &prompt) {
            Ok(text) => self
                .settings
                .length_policy
                .judge(parse_response(&text), notes.len()),
            Err(why) => ChunkOutcome::Failed(format!("{:#}", why)),
        }
    }

    fn fall_back(&mut self, notes: &mut [Note]) {
        self.fallback
            .humanize_all(notes.iter_mut(), FALLBACK_VELOCITY_AMOUNT, FALLBACK_TIMING_AMOUNT);
    }

    fn stop_requested(&self) -> bool {
        self.control
            .as_ref()
            .is_some_and(|control| matches!(control.try_recv(), Ok(ControlMsg::Stop)))
    }
}
