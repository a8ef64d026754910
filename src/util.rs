use crate::{Backoff, FixedDelay, Mode, NoDelay, Pacer, PerformerStyle, TokenBucket, TrackId, TrackSelection};
use log::{info, warn};
use std::time::Duration;

/// Longest wait the adaptive backoff grows to, as a multiple of the base delay.
const BACKOFF_CEILING: u32 = 32;

pub fn parse_mode(input: &str) -> Mode {
    match input.to_lowercase().as_str() {
        "s" | "stat" | "statistical" => Mode::Statistical,
        "l" | "llm" | "g" | "gemini" | "ai" => Mode::Llm,
        other => {
            info!("Unknown mode '{}', defaulting to `statistical`..!", other);
            Mode::Statistical
        }
    }
}

pub fn parse_performer(input: &str) -> PerformerStyle {
    match input.to_lowercase().as_str() {
        "i" | "instrument" | "track" => PerformerStyle::Instrument,
        "p" | "piano" | "pianist" => PerformerStyle::Pianist,
        other => {
            info!("Unknown performer style '{}', defaulting to `instrument`..!", other);
            PerformerStyle::Instrument
        }
    }
}

/// Pacing strategies selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingKind {
    Fixed,
    None,
    Bucket,
    Backoff,
}

pub fn parse_pacing(input: &str) -> PacingKind {
    match input.to_lowercase().as_str() {
        "f" | "fixed" => PacingKind::Fixed,
        "n" | "none" | "off" => PacingKind::None,
        "b" | "bucket" | "token-bucket" => PacingKind::Bucket,
        "backoff" | "adaptive" => PacingKind::Backoff,
        other => {
            info!("Unknown pacing '{}', defaulting to `fixed`..!", other);
            PacingKind::Fixed
        }
    }
}

/// Build the pacer for `kind`, using `delay` as its base interval.
pub fn build_pacer(kind: PacingKind, delay: Duration) -> Box<dyn Pacer> {
    match kind {
        PacingKind::Fixed => Box::new(FixedDelay::new(delay)),
        PacingKind::None => Box::new(NoDelay),
        PacingKind::Bucket => {
            let per_sec = if delay.is_zero() {
                f64::MAX
            } else {
                1.0 / delay.as_secs_f64()
            };
            Box::new(TokenBucket::new(1, per_sec))
        }
        PacingKind::Backoff => Box::new(Backoff::new(delay, delay.saturating_mul(BACKOFF_CEILING))),
    }
}

/// Parse a comma separated list of track ids; `None`, empty or "all" selects every track.
pub fn parse_selection(input: Option<&str>) -> TrackSelection {
    let Some(input) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return TrackSelection::All;
    };

    if input.eq_ignore_ascii_case("all") {
        return TrackSelection::All;
    }

    let ids = input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match token.trim_start_matches('#').parse::<usize>() {
            Ok(id) => Some(TrackId(id)),
            Err(_) => {
                warn!("Ignoring invalid track id '{}'..!", token);
                None
            }
        });

    TrackSelection::only(ids)
}
