mod chunking;
mod engine;
mod error;
mod humanizer;
mod llm;
mod midi_codec;
mod model;
mod prompt;
mod report;
mod statistical;
mod util;

pub use chunking::*;
pub use engine::gemini::*;
pub use engine::pacing::*;
pub use engine::GenerationBackend;
pub use error::*;
pub use humanizer::*;
pub use llm::*;
pub use midi_codec::{decode_performance, encode_performance, import_midi_file};
pub use model::config::*;
pub use model::performance::*;
pub use model::programs::*;
pub use prompt::*;
pub use report::*;
pub use statistical::*;
pub use util::*;
