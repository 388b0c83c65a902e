//! Shared test utilities
//!
//! Hardware-free fakes for the audio renderer and speech synthesizer, plus
//! a config builder pointed at nothing in particular.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sentio_gateway::config::{AgentConfig, AsrConfig, Config, TtsConfig, VoiceConfig};
use sentio_gateway::{AudioRenderer, DecodedAudio, Result, SpeechSynthesizer};

/// Renderer that records playback order and completes instantly
#[derive(Default)]
pub struct InstantRenderer {
    pub rendered: Mutex<Vec<u32>>,
    pub halts: AtomicUsize,
}

impl InstantRenderer {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl AudioRenderer for InstantRenderer {
    async fn render(&self, audio: DecodedAudio) -> Result<()> {
        self.rendered.lock().unwrap().push(audio.sample_rate);
        Ok(())
    }

    fn halt(&self) {
        self.halts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Synthesizer that fabricates one short buffer per sentence and records
/// the texts it was asked to speak
#[derive(Default)]
pub struct FakeSynthesizer {
    pub spoken: Mutex<Vec<String>>,
    /// Texts that should fail synthesis
    pub failing: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().push(text.to_string());
    }

    #[must_use]
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Option<DecodedAudio>> {
        if self.failing.lock().unwrap().iter().any(|t| t == text) {
            return Err(sentio_gateway::Error::Tts("synthetic failure".to_string()));
        }
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(Some(DecodedAudio {
            samples: vec![0.0; 8],
            sample_rate: 24000,
        }))
    }
}

/// Config that never touches the network in tests
#[must_use]
pub fn test_config(min_sentence_len: usize) -> Config {
    Config {
        data_dir: std::env::temp_dir(),
        agent: AgentConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            engine: "default".to_string(),
            api_key: None,
        },
        voice: VoiceConfig {
            sound: true,
            mic_enabled: false,
            punctuation: "。！？；.!?;".to_string(),
            min_sentence_len,
            tts: TtsConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                engine: "edge".to_string(),
                voice: "test".to_string(),
                speed: 1.0,
                api_key: None,
            },
            asr: AsrConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                engine: "funasr".to_string(),
                model: "test".to_string(),
                api_key: None,
            },
        },
        character: None,
        screenshot_timeout_secs: 1,
    }
}
