use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use midi_humanizer::{
    Args, ControlMsg, GeminiBackend, HumanizeRequest, Humanizer, LengthPolicy, LlmHumanizer,
    LlmSettings, LogReporter, Mode, build_pacer, decode_performance, parse_mode, parse_pacing,
    parse_performer, parse_selection, suggested_tracks,
};
use std::fs;
use std::sync::mpsc;
use std::time::Duration;

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(if args.verbose {
        "debug"
    } else {
        "info"
    }))
    .init();

    info!("Reading MIDI file: '{}'...", args.midi.display());
    let raw = fs::read(&args.midi)
        .with_context(|| format!("Failed to read MIDI file {}", args.midi.display()))?;

    if args.list_tracks {
        let performance = decode_performance(&raw)?;
        let suggested = suggested_tracks(&performance);

        for id in performance.track_ids() {
            let track = &performance.tracks[id.0];
            info!(
                "{:>4} | {:<36} | {:>5} notes | ch {:>2}{}{}",
                id.0,
                track.label(id),
                track.notes.len(),
                track.channel + 1,
                if track.is_drum { " | drums (skipped)" } else { "" },
                if suggested.contains(&id) { " | suggested" } else { "" },
            );
        }
        return Ok(());
    }

    let mode = parse_mode(&args.mode);
    let settings = LlmSettings {
        chunk_size: args.chunk_size,
        performer: parse_performer(&args.performer),
        length_policy: if args.strict_length {
            LengthPolicy::Strict
        } else {
            LengthPolicy::Partial
        },
    };

    let backend = GeminiBackend::new(&args.model)
        .with_endpoint(&args.endpoint)
        .with_timeout(Duration::from_secs(args.timeout_secs));

    let mut llm = LlmHumanizer::new(backend).with_settings(settings).with_pacer(build_pacer(
        parse_pacing(&args.pacing),
        Duration::from_millis(args.delay_ms),
    ));

    if mode == Mode::Llm {
        let (stop_tx, stop_rx) = mpsc::channel::<ControlMsg>();

        ctrlc::set_handler(move || {
            warn!("Ctrl-C received, finishing the current chunk then stopping..!");
            let _ = stop_tx.send(ControlMsg::Stop);
        })
        .context("Error setting Ctrl-C handler..!")?;

        llm = llm.with_control(stop_rx);
    }

    let mut humanizer = Humanizer::new(llm);
    if let Some(seed) = args.seed {
        humanizer = humanizer.with_seed(seed);
    }

    let request = HumanizeRequest {
        mode,
        velocity_amount: args.velocity,
        timing_amount: args.timing,
        api_key: args.api_key.clone(),
        selection: parse_selection(args.tracks.as_deref()),
    };

    let mut reporter = LogReporter::new();
    let out = humanizer.process(&raw, &request, &mut reporter)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.midi.with_extension("humanized.mid"));
    fs::write(&output, out)
        .with_context(|| format!("Failed to write MIDI file {}", output.display()))?;

    info!(
        "Wrote '{}' with {} warning(s)..!",
        output.display(),
        reporter.warning_count()
    );

    Ok(())
}
