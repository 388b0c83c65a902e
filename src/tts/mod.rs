//! Speech synthesis
//!
//! Sentence segmentation, text preprocessing, and the synthesis client that
//! turns sentence spans into decoded audio for the playback queue.

mod client;
mod preprocess;
mod segmenter;

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::audio::{DecodedAudio, decode_mp3};

pub use client::TtsClient;
pub use preprocess::prepare_for_speech;
pub use segmenter::{SegmenterStep, SentenceSegmenter};

/// Turns one sentence of text into decoded audio
///
/// Seam between the speech pipeline and the synthesis backend; the
/// production implementation is [`TtsSynthesizer`], tests substitute fakes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text`; `None` means the engine produced no audio
    async fn synthesize(&self, text: &str) -> Result<Option<DecodedAudio>>;
}

/// Production synthesizer: TTS client plus MP3 decode
pub struct TtsSynthesizer {
    client: Arc<TtsClient>,
}

impl TtsSynthesizer {
    /// Wrap a TTS client
    #[must_use]
    pub fn new(client: Arc<TtsClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SpeechSynthesizer for TtsSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Option<DecodedAudio>> {
        let Some(bytes) = self.client.synthesize(text).await? else {
            return Ok(None);
        };
        let audio = decode_mp3(&bytes)?;
        tracing::debug!(
            text_len = text.len(),
            duration_ms = audio.duration_ms(),
            "sentence synthesized"
        );
        Ok(Some(audio))
    }
}
