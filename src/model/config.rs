use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "midi-humanizer",
    about = "Make a MIDI performance sound less mechanical!"
)]
pub struct Args {
    /// Path to the source MIDI file.
    pub midi: PathBuf,

    /// Where to write the result. Defaults to `<input>.humanized.mid` next to the input.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Humanization mode: statistical|llm.
    #[arg(short, long, default_value = "statistical")]
    pub mode: String,

    /// Strength of the velocity noise in statistical mode (0.0..=1.0).
    #[arg(long, default_value_t = 0.5)]
    pub velocity: f64,

    /// Strength of the timing noise in statistical mode (0.0..=1.0).
    #[arg(long, default_value_t = 0.3)]
    pub timing: f64,

    /// API key for the generation service. Only used in llm mode.
    #[arg(long = "api-key", env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Comma separated track ids to humanize (see `--list-tracks`). Defaults to every non-drum track.
    #[arg(short, long)]
    pub tracks: Option<String>,

    /// Print the tracks found in the file and exit.
    #[arg(short, long, default_value_t = false)]
    pub list_tracks: bool,

    /// Model name passed to the generation service.
    #[arg(long, default_value = crate::DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the generation service.
    #[arg(long, default_value = crate::DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Request timeout in seconds.
    #[arg(long = "timeout", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Notes sent to the model per request.
    #[arg(long = "chunk-size", default_value_t = crate::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Request pacing: fixed|none|bucket|backoff.
    #[arg(long, default_value = "fixed")]
    pub pacing: String,

    /// Base delay between requests in milliseconds.
    #[arg(long = "delay-ms", default_value_t = 1000)]
    pub delay_ms: u64,

    /// How the model is told who plays the track: instrument|pianist.
    #[arg(long, default_value = "instrument")]
    pub performer: String,

    /// Fall back to statistical humanization whenever the model returns the wrong number of velocities.
    #[arg(long = "strict-length", default_value_t = false)]
    pub strict_length: bool,

    /// Seed for reproducible statistical noise.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Prints extra information to the terminal.
    #[arg(short, long)]
    pub verbose: bool,
}
