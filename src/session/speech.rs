//! Speech pipeline driver
//!
//! Polls the response accumulator for synthesizable sentence spans and feeds
//! them through preprocessing, synthesis, and the playback queue. The loop is
//! an explicit idle-backoff state machine: when no boundary is available yet
//! it sleeps briefly and re-polls, terminating only when a cancelled flag is
//! raised or the stream completes with no remaining text.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::agent::SharedAccumulator;
use crate::audio::PlaybackQueue;
use crate::tts::{SegmenterStep, SentenceSegmenter, SpeechSynthesizer, prepare_for_speech};

/// Idle backoff while waiting for more streamed text
const SEGMENTER_POLL: Duration = Duration::from_millis(10);

/// Drives sentence segmentation and synthesis for one request
pub struct SpeechPipeline {
    segmenter: SentenceSegmenter,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    queue: Arc<PlaybackQueue>,
    acc: SharedAccumulator,
    cancelled: Arc<AtomicBool>,
}

impl SpeechPipeline {
    /// Create a pipeline over one request's accumulator
    ///
    /// `cancelled` is shared with the session; raising it stops the loop at
    /// the next step boundary. Queued audio is not touched by cancellation.
    #[must_use]
    pub fn new(
        segmenter: SentenceSegmenter,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        queue: Arc<PlaybackQueue>,
        acc: SharedAccumulator,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            segmenter,
            synthesizer,
            queue,
            acc,
            cancelled,
        }
    }

    /// Run until the response is fully spoken or the request is cancelled
    ///
    /// One span is dispatched per iteration; the next scan happens only after
    /// the synthesis call for the previous span resolves. Synthesis failures
    /// are logged and skipped — the cursor has already advanced, so the loop
    /// always makes forward progress.
    pub async fn run(self) {
        loop {
            if self.cancelled.load(Ordering::Acquire) {
                tracing::debug!("speech pipeline cancelled");
                return;
            }

            let step = {
                let acc = self.acc.lock().expect("accumulator lock");
                self.segmenter
                    .next_step(acc.response_text(), acc.tts_cursor(), acc.stream_done())
            };

            match step {
                SegmenterStep::Emit { span, next_cursor } => {
                    self.acc
                        .lock()
                        .expect("accumulator lock")
                        .advance_cursor(next_cursor);

                    let text = prepare_for_speech(&span);
                    if text.is_empty() {
                        // Nothing speakable in this span; counts as a
                        // completed synthesis step.
                        continue;
                    }

                    match self.synthesizer.synthesize(&text).await {
                        Ok(Some(audio)) => {
                            if self.cancelled.load(Ordering::Acquire) {
                                // Superseded while synthesizing; drop the
                                // audio rather than queue stale speech.
                                return;
                            }
                            self.queue.push(audio);
                        }
                        Ok(None) => {
                            tracing::debug!(span_len = text.len(), "no audio for span");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "sentence synthesis failed, continuing");
                        }
                    }
                }
                SegmenterStep::Wait => {
                    tokio::time::sleep(SEGMENTER_POLL).await;
                }
                SegmenterStep::Complete => {
                    tracing::debug!("speech pipeline drained");
                    return;
                }
            }
        }
    }
}
