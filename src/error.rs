//! Error types for the doorghost voice agent

use thiserror::Error;

/// Result type alias for doorghost operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice agent
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed audio buffer fed to the effect pipeline
    #[error("invalid audio format: {0}")]
    InvalidAudioFormat(String),

    /// Speech synthesis produced no usable artifact
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Audio output device unavailable or playback failed
    #[error("playback error: {0}")]
    Playback(String),

    /// Capture device or permission problem
    #[error("capture device error: {0}")]
    Device(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Language model call failed
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
