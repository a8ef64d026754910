use thiserror::Error;

/// Problems with the request itself, detected before any note is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("an API key is required for LLM humanization")]
    MissingApiKey,
    #[error("no humanizable tracks were selected")]
    NoTargetTracks,
}

#[derive(Debug, Error)]
pub enum HumanizeError {
    #[error("Failed to decode MIDI: {0}")]
    Decode(String),
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("Failed to encode MIDI: {0}")]
    Encode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HumanizeError>;
