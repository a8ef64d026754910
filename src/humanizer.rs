use crate::engine::GenerationBackend;
use crate::error::{ConfigError, Result};
use crate::llm::LlmHumanizer;
use crate::midi_codec::{decode_performance, encode_performance};
use crate::model::performance::*;
use crate::report::{ProgressState, Reporter};
use crate::statistical::StatisticalHumanizer;
use log::{debug, error, info};

/// Notes processed between progress reports on the statistical path.
const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Statistical,
    Llm,
}

/// One user action: how to humanize and what to touch.
#[derive(Debug, Clone)]
pub struct HumanizeRequest {
    pub mode: Mode,
    /// Velocity noise strength, nominally `0.0..=1.0`.
    pub velocity_amount: f64,
    /// Timing noise strength, nominally `0.0..=1.0`.
    pub timing_amount: f64,
    pub api_key: Option<String>,
    pub selection: TrackSelection,
}

impl Default for HumanizeRequest {
    fn default() -> Self {
        Self {
            mode: Mode::Statistical,
            velocity_amount: 0.5,
            timing_amount: 0.3,
            api_key: None,
            selection: TrackSelection::All,
        }
    }
}

impl HumanizeRequest {
    fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Entry point: bytes in, humanized bytes out.
pub struct Humanizer<B: GenerationBackend> {
    llm: LlmHumanizer<B>,
    statistical: StatisticalHumanizer,
}

impl<B: GenerationBackend> Humanizer<B> {
    pub fn new(llm: LlmHumanizer<B>) -> Self {
        Self {
            llm,
            statistical: StatisticalHumanizer::new(),
        }
    }

    /// Make both the statistical path and the LLM fallback reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.statistical = StatisticalHumanizer::with_seed(seed);
        self.llm = self.llm.with_seed(seed.wrapping_add(1));
        self
    }

    pub fn llm(&self) -> &LlmHumanizer<B> {
        &self.llm
    }

    pub fn process(
        &mut self,
        raw: &[u8],
        request: &HumanizeRequest,
        reporter: &mut dyn Reporter,
    ) -> Result<Vec<u8>> {
        if request.mode == Mode::Llm && request.api_key().is_none() {
            error!("An API key is required for LLM humanization..!");
            return Err(ConfigError::MissingApiKey.into());
        }

        let mut performance = decode_performance(raw).inspect_err(|why| {
            error!("{}..!", why);
        })?;

        self.humanize_performance(&mut performance, request, reporter)?;

        encode_performance(&performance)
    }

    /// Validate `request` against `performance`, then humanize it in place.
    pub fn humanize_performance(
        &mut self,
        performance: &mut Performance,
        request: &HumanizeRequest,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        let api_key = match (request.mode, request.api_key()) {
            (Mode::Llm, None) => return Err(ConfigError::MissingApiKey.into()),
            (_, key) => key.unwrap_or_default(),
        };

        let targets = performance.targets(&request.selection);
        if targets.is_empty() {
            error!("No humanizable tracks were selected..!");
            return Err(ConfigError::NoTargetTracks.into());
        }

        info!(
            "Humanizing {} track(s), {} notes, mode: {:?}..!",
            targets.len(),
            performance.note_count(&targets),
            request.mode
        );

        match request.mode {
            Mode::Llm => self
                .llm
                .humanize(performance, api_key, &request.selection, reporter),
            Mode::Statistical => self.humanize_statistically(
                performance,
                &targets,
                request.velocity_amount,
                request.timing_amount,
                reporter,
            ),
        }

        Ok(())
    }

    fn humanize_statistically(
        &mut self,
        performance: &mut Performance,
        targets: &[TrackId],
        velocity_amount: f64,
        timing_amount: f64,
        reporter: &mut dyn Reporter,
    ) {
        let total_notes = performance.note_count(targets);
        let mut processed = 0usize;
        let mut progress = ProgressState::default();

        for id in targets {
            let track = &mut performance.tracks[id.0];
            debug!("Humanizing {} notes on track {}..!", track.notes.len(), id);

            for note in track.notes.iter_mut() {
                self.statistical
                    .humanize(note, velocity_amount, timing_amount);
                processed += 1;

                if processed % PROGRESS_EVERY == 0 {
                    progress.advance(processed as f64 / total_notes as f64, reporter);
                }
            }
        }

        progress.finish(reporter);
    }
}
