//! Speech synthesis client
//!
//! Sends sentence spans to the configured TTS engine and returns the audio
//! bytes. The local Sentio engine replies with a JSON-wrapped base64 payload
//! (empty string means "no audio"); OpenAI-compatible engines reply with the
//! raw MP3 body.

use base64::Engine as _;
use serde::Deserialize;

use crate::config::TtsConfig;
use crate::{Error, Result};

/// TTS provider backend
#[derive(Clone, Copy, Debug)]
enum TtsProvider {
    /// Sentio TTS server (`/tts/infer`, base64 JSON response)
    Sentio,
    /// OpenAI-compatible `/v1/audio/speech` endpoint (raw MP3 response)
    OpenAi,
}

/// Response from the Sentio TTS server
#[derive(Debug, Deserialize)]
struct SentioTtsResponse {
    /// Base64-encoded MP3 payload; empty string when no audio was produced
    #[serde(default)]
    audio: String,
}

/// Synthesizes speech from text
pub struct TtsClient {
    client: reqwest::Client,
    config: TtsConfig,
    provider: TtsProvider,
}

impl TtsClient {
    /// Create a new TTS client
    ///
    /// The provider is chosen from the configured engine identifier;
    /// `"openai"` selects the OpenAI-compatible endpoint, anything else the
    /// Sentio server protocol.
    #[must_use]
    pub fn new(config: TtsConfig) -> Self {
        let provider = if config.engine.eq_ignore_ascii_case("openai") {
            TtsProvider::OpenAi
        } else {
            TtsProvider::Sentio
        };
        Self {
            client: reqwest::Client::new(),
            config,
            provider,
        }
    }

    /// Synthesize `text` to MP3 bytes
    ///
    /// Returns `None` when the engine produced no audio for the input (a
    /// valid outcome for e.g. markup-only spans), `Some(bytes)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the payload cannot be decoded.
    pub async fn synthesize(&self, text: &str) -> Result<Option<Vec<u8>>> {
        match self.provider {
            TtsProvider::Sentio => self.synthesize_sentio(text).await,
            TtsProvider::OpenAi => self.synthesize_openai(text).await,
        }
    }

    /// Synthesize via the Sentio TTS server
    async fn synthesize_sentio(&self, text: &str) -> Result<Option<Vec<u8>>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            engine: &'a str,
            voice: &'a str,
            speed: f64,
            text: &'a str,
        }

        let request = TtsRequest {
            engine: &self.config.engine,
            voice: &self.config.voice,
            speed: self.config.speed,
            text,
        };

        let url = format!("{}/tts/infer", self.config.base_url);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("Sentio TTS error {status}: {body}")));
        }

        let result: SentioTtsResponse = response.json().await?;
        if result.audio.is_empty() {
            tracing::debug!(text_len = text.len(), "TTS produced no audio");
            return Ok(None);
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(result.audio.as_bytes())
            .map_err(|e| Error::Tts(format!("invalid base64 audio payload: {e}")))?;
        Ok(Some(bytes))
    }

    /// Synthesize via an OpenAI-compatible speech endpoint
    async fn synthesize_openai(&self, text: &str) -> Result<Option<Vec<u8>>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f64,
        }

        let request = SpeechRequest {
            model: "tts-1",
            input: text,
            voice: &self.config.voice,
            speed: self.config.speed,
        };

        let url = format!("{}/v1/audio/speech", self.config.base_url);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Ok(None);
        }
        Ok(Some(audio.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(engine: &str) -> TtsConfig {
        TtsConfig {
            base_url: "http://localhost:8880".to_string(),
            engine: engine.to_string(),
            voice: "zh-CN-XiaoxiaoNeural".to_string(),
            speed: 1.0,
            api_key: None,
        }
    }

    #[test]
    fn engine_selects_provider() {
        let sentio = TtsClient::new(config("edge"));
        assert!(matches!(sentio.provider, TtsProvider::Sentio));

        let openai = TtsClient::new(config("OpenAI"));
        assert!(matches!(openai.provider, TtsProvider::OpenAi));
    }

    #[test]
    fn empty_audio_field_deserializes() {
        let response: SentioTtsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.audio.is_empty());

        let response: SentioTtsResponse =
            serde_json::from_str(r#"{"audio":"QUJD"}"#).unwrap();
        assert_eq!(response.audio, "QUJD");
    }
}
