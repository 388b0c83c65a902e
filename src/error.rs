//! Error types for the Sentio gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Sentio gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Agent stream error
    #[error("agent error: {0}")]
    Agent(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Audio decode error (malformed payload)
    #[error("decode error: {0}")]
    Decode(String),

    /// Cross-frame screenshot error
    #[error("screenshot error: {0}")]
    Screenshot(String),

    /// Avatar renderer error
    #[error("avatar error: {0}")]
    Avatar(String),

    /// Request superseded by a newer one (not a failure)
    #[error("request cancelled")]
    Cancelled,

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
