//! Configuration management for the Sentio gateway

pub mod file;

use std::path::PathBuf;

use crate::Result;

/// Default sentence-boundary punctuation for speech chunking
pub const DEFAULT_TTS_PUNCTUATION: &str = "。！？；.!?;";

/// Default minimum sentence length (chars) before a boundary is honored
pub const DEFAULT_TTS_MIN_SENTENCE_LEN: usize = 6;

/// Sentio gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (recordings, cache, etc)
    pub data_dir: PathBuf,

    /// Agent stream configuration
    pub agent: AgentConfig,

    /// Voice configuration (TTS + ASR)
    pub voice: VoiceConfig,

    /// Avatar character model identifier
    pub character: Option<String>,

    /// Cross-frame screenshot request timeout in seconds
    pub screenshot_timeout_secs: u64,
}

/// Agent stream configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Agent service base URL
    pub base_url: String,

    /// Agent engine identifier (server-side routing key)
    pub engine: String,

    /// API key, if the agent service requires one
    pub api_key: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable speech synthesis of agent replies
    pub sound: bool,

    /// Enable microphone input
    pub mic_enabled: bool,

    /// Sentence-boundary punctuation marks for TTS chunking
    pub punctuation: String,

    /// Minimum sentence length (chars) before a boundary is honored
    pub min_sentence_len: usize,

    /// Speech synthesis engine
    pub tts: TtsConfig,

    /// Speech recognition engine
    pub asr: AsrConfig,
}

/// Speech synthesis engine configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// TTS service base URL
    pub base_url: String,

    /// TTS engine identifier (e.g. "edge", "openai")
    pub engine: String,

    /// Voice identifier
    pub voice: String,

    /// Speed multiplier (0.25 to 4.0)
    pub speed: f64,

    /// API key, if the TTS service requires one
    pub api_key: Option<String>,
}

/// Speech recognition engine configuration
#[derive(Debug, Clone)]
pub struct AsrConfig {
    /// ASR service base URL
    pub base_url: String,

    /// ASR engine identifier (e.g. "funasr", "whisper")
    pub engine: String,

    /// Model identifier
    pub model: String,

    /// API key, if the ASR service requires one
    pub api_key: Option<String>,
}

impl Config {
    /// Load configuration from the TOML file overlaid with environment variables
    ///
    /// Priority: env > toml > default.
    ///
    /// # Errors
    ///
    /// Returns error if a config file exists but cannot be parsed
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();

        let agent = AgentConfig {
            base_url: std::env::var("SENTIO_AGENT_URL")
                .ok()
                .or(fc.agent.base_url)
                .unwrap_or_else(|| "http://localhost:8880".to_string()),
            engine: std::env::var("SENTIO_AGENT_ENGINE")
                .ok()
                .or(fc.agent.engine)
                .unwrap_or_else(|| "default".to_string()),
            api_key: std::env::var("SENTIO_AGENT_API_KEY").ok().or(fc.agent.api_key),
        };

        let tts = TtsConfig {
            base_url: std::env::var("SENTIO_TTS_URL")
                .ok()
                .or(fc.tts.base_url)
                .unwrap_or_else(|| agent.base_url.clone()),
            engine: std::env::var("SENTIO_TTS_ENGINE")
                .ok()
                .or(fc.tts.engine)
                .unwrap_or_else(|| "edge".to_string()),
            voice: std::env::var("SENTIO_TTS_VOICE")
                .ok()
                .or(fc.tts.voice)
                .unwrap_or_else(|| "zh-CN-XiaoxiaoNeural".to_string()),
            speed: fc.tts.speed.unwrap_or(1.0),
            api_key: std::env::var("SENTIO_TTS_API_KEY").ok().or(fc.tts.api_key),
        };

        let asr = AsrConfig {
            base_url: std::env::var("SENTIO_ASR_URL")
                .ok()
                .or(fc.asr.base_url)
                .unwrap_or_else(|| agent.base_url.clone()),
            engine: std::env::var("SENTIO_ASR_ENGINE")
                .ok()
                .or(fc.asr.engine)
                .unwrap_or_else(|| "funasr".to_string()),
            model: std::env::var("SENTIO_ASR_MODEL")
                .ok()
                .or(fc.asr.model)
                .unwrap_or_else(|| "paraformer".to_string()),
            api_key: std::env::var("SENTIO_ASR_API_KEY").ok().or(fc.asr.api_key),
        };

        let voice = VoiceConfig {
            sound: fc.voice.sound.unwrap_or(true),
            mic_enabled: fc.voice.mic_enabled.unwrap_or(true),
            punctuation: fc
                .voice
                .punctuation
                .unwrap_or_else(|| DEFAULT_TTS_PUNCTUATION.to_string()),
            min_sentence_len: fc
                .voice
                .min_sentence_len
                .unwrap_or(DEFAULT_TTS_MIN_SENTENCE_LEN),
            tts,
            asr,
        };

        // Data directory (~/.local/share/sentio/gateway on Linux)
        let data_dir = directories::BaseDirs::new()
            .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("sentio").join("gateway"));
        std::fs::create_dir_all(&data_dir).ok();

        Ok(Self {
            data_dir,
            agent,
            voice,
            character: fc.character,
            screenshot_timeout_secs: fc.embed.screenshot_timeout_secs.unwrap_or(30),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_punctuation_covers_cjk_and_ascii() {
        assert!(DEFAULT_TTS_PUNCTUATION.contains('。'));
        assert!(DEFAULT_TTS_PUNCTUATION.contains('.'));
        assert!(DEFAULT_TTS_PUNCTUATION.contains('？'));
        assert!(DEFAULT_TTS_PUNCTUATION.contains(';'));
    }
}
