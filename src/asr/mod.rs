//! Speech recognition client
//!
//! Uploads captured audio to the configured ASR engine and returns the
//! recognized text. An empty result is not an error — the caller clears the
//! pending input silently.

use serde::Deserialize;

use crate::config::AsrConfig;
use crate::{Error, Result};

/// Response from the Sentio ASR server
#[derive(Debug, Deserialize)]
struct SentioAsrResponse {
    #[serde(default)]
    text: String,
}

/// Response from an OpenAI-compatible transcription endpoint
#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

/// ASR provider backend
#[derive(Clone, Copy, Debug)]
enum AsrProvider {
    /// Sentio ASR server (`/asr/infer`, multipart upload)
    Sentio,
    /// OpenAI-compatible `/v1/audio/transcriptions` endpoint
    Whisper,
}

/// Transcribes speech to text
pub struct AsrClient {
    client: reqwest::Client,
    config: AsrConfig,
    provider: AsrProvider,
}

impl AsrClient {
    /// Create a new ASR client
    ///
    /// `"whisper"` selects the OpenAI-compatible endpoint, anything else the
    /// Sentio server protocol.
    #[must_use]
    pub fn new(config: AsrConfig) -> Self {
        let provider = if config.engine.eq_ignore_ascii_case("whisper") {
            AsrProvider::Whisper
        } else {
            AsrProvider::Sentio
        };
        Self {
            client: reqwest::Client::new(),
            config,
            provider,
        }
    }

    /// Transcribe WAV audio to text
    ///
    /// Returns the recognized text, which may be empty when nothing was
    /// understood.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    pub async fn transcribe(&self, audio: Vec<u8>) -> Result<String> {
        match self.provider {
            AsrProvider::Sentio => self.transcribe_sentio(audio).await,
            AsrProvider::Whisper => self.transcribe_whisper(audio).await,
        }
    }

    /// Transcribe via the Sentio ASR server
    async fn transcribe_sentio(&self, audio: Vec<u8>) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        let part = reqwest::multipart::Part::bytes(audio)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Stt(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("engine", self.config.engine.clone())
            .text("model", self.config.model.clone());

        let url = format!("{}/asr/infer", self.config.base_url);
        let mut builder = self.client.post(&url).multipart(form);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "ASR API error");
            return Err(Error::Stt(format!("ASR error {status}: {body}")));
        }

        let result: SentioAsrResponse = response.json().await?;
        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }

    /// Transcribe via an OpenAI-compatible transcription endpoint
    async fn transcribe_whisper(&self, audio: Vec<u8>) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.config.model.clone());

        let url = format!("{}/v1/audio/transcriptions", self.config.base_url);
        let mut builder = self.client.post(&url).multipart(form);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;
        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(engine: &str) -> AsrConfig {
        AsrConfig {
            base_url: "http://localhost:8880".to_string(),
            engine: engine.to_string(),
            model: "paraformer".to_string(),
            api_key: None,
        }
    }

    #[test]
    fn engine_selects_provider() {
        let sentio = AsrClient::new(config("funasr"));
        assert!(matches!(sentio.provider, AsrProvider::Sentio));

        let whisper = AsrClient::new(config("Whisper"));
        assert!(matches!(whisper.provider, AsrProvider::Whisper));
    }

    #[test]
    fn missing_text_field_is_empty_not_error() {
        let response: SentioAsrResponse = serde_json::from_str("{}").unwrap();
        assert!(response.text.is_empty());
    }
}
