//! TOML configuration file loading
//!
//! Supports `~/.config/sentio/gateway/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct SentioConfigFile {
    /// Avatar character model identifier
    #[serde(default)]
    pub character: Option<String>,

    /// Agent stream configuration
    #[serde(default)]
    pub agent: AgentFileConfig,

    /// Voice behavior configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Speech synthesis engine configuration
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// Speech recognition engine configuration
    #[serde(default)]
    pub asr: AsrFileConfig,

    /// Embed/cross-frame configuration
    #[serde(default)]
    pub embed: EmbedFileConfig,
}

/// Agent-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct AgentFileConfig {
    /// Agent service base URL
    pub base_url: Option<String>,

    /// Agent engine identifier
    pub engine: Option<String>,

    /// API key for the agent service
    pub api_key: Option<String>,
}

/// Voice behavior configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Speak agent replies aloud
    pub sound: Option<bool>,

    /// Enable microphone input
    pub mic_enabled: Option<bool>,

    /// Sentence-boundary punctuation marks for TTS chunking
    pub punctuation: Option<String>,

    /// Minimum sentence length (chars) before a boundary is honored
    pub min_sentence_len: Option<usize>,
}

/// Speech synthesis engine configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    pub base_url: Option<String>,
    pub engine: Option<String>,
    pub voice: Option<String>,
    pub speed: Option<f64>,
    pub api_key: Option<String>,
}

/// Speech recognition engine configuration
#[derive(Debug, Default, Deserialize)]
pub struct AsrFileConfig {
    pub base_url: Option<String>,
    pub engine: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

/// Embed/cross-frame configuration
#[derive(Debug, Default, Deserialize)]
pub struct EmbedFileConfig {
    /// Screenshot request timeout in seconds
    pub screenshot_timeout_secs: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `SentioConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> SentioConfigFile {
    let Some(path) = config_file_path() else {
        return SentioConfigFile::default();
    };

    if !path.exists() {
        return SentioConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                SentioConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            SentioConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/sentio/gateway/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("sentio")
            .join("gateway")
            .join("config.toml")
    })
}
