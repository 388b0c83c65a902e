//! Chat session controller
//!
//! Owns the per-session context: playback queue, service clients, transcript,
//! and the currently active request. Construction opens the session's
//! resources; dropping it releases them. There are no process-wide singletons
//! — hosts embed as many sessions as they need.

mod speech;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{AbortHandle, Abortable};
use futures::{Stream, StreamExt, pin_mut};
use tokio::task::JoinHandle;

use crate::agent::{
    AgentClient, ChatStreamRequest, ERROR_MESSAGE, EventRouter, PostProcess, ResponseAccumulator,
    SharedAccumulator, StreamEvent,
};
use crate::asr::AsrClient;
use crate::audio::{AudioRenderer, PlaybackQueue};
use crate::avatar::{AvatarSink, ConsoleAvatar};
use crate::config::Config;
use crate::embed::{FrameTransport, ScreenshotBroker};
use crate::transcript::{ChatRecord, ChatRole, DisplaySink, Transcript, TranscriptSink};
use crate::tts::{SentenceSegmenter, SpeechSynthesizer, TtsClient, TtsSynthesizer};
use crate::{Error, Result};

pub use speech::SpeechPipeline;

/// Placeholder content for the assistant record while the reply streams in
const PENDING_PLACEHOLDER: &str = "...";

/// Book-keeping for the request currently in flight
struct ActiveRequest {
    /// Cleared on supersede; guards display mutation and the speech loop
    live: Arc<AtomicBool>,
    /// Aborts the network event stream
    abort: AbortHandle,
    /// The speech pipeline task, once the first answer delta arrived
    speech: Option<JoinHandle<()>>,
}

/// One conversational session with the agent
pub struct ChatSession {
    config: Config,
    agent: AgentClient,
    asr: AsrClient,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    queue: Arc<PlaybackQueue>,
    avatar: Arc<dyn AvatarSink>,
    transcript: Transcript,
    display: Arc<dyn DisplaySink>,
    post_process: Option<Arc<dyn PostProcess>>,
    screenshot: Option<Arc<ScreenshotBroker>>,
    conversation_id: Mutex<Option<String>>,
    active: Mutex<Option<ActiveRequest>>,
}

impl ChatSession {
    /// Create a session rendering audio through `renderer`
    #[must_use]
    pub fn new(config: Config, renderer: Arc<dyn AudioRenderer>) -> Self {
        let transcript = Transcript::new();
        let display: Arc<dyn DisplaySink> = Arc::new(TranscriptSink::new(transcript.clone()));
        let agent = AgentClient::new(config.agent.clone());
        let asr = AsrClient::new(config.voice.asr.clone());
        let tts = Arc::new(TtsClient::new(config.voice.tts.clone()));

        Self {
            agent,
            asr,
            synthesizer: Arc::new(TtsSynthesizer::new(tts)),
            queue: PlaybackQueue::new(renderer),
            avatar: Arc::new(ConsoleAvatar::new()),
            transcript,
            display,
            post_process: None,
            screenshot: None,
            conversation_id: Mutex::new(None),
            active: Mutex::new(None),
            config,
        }
    }

    /// Replace the display sink (default: transcript write-through)
    #[must_use]
    pub fn with_display(mut self, display: Arc<dyn DisplaySink>) -> Self {
        self.display = display;
        self
    }

    /// Replace the speech synthesizer (default: configured TTS engine)
    #[must_use]
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// Attach a post-processing collaborator for completed responses
    #[must_use]
    pub fn with_post_process(mut self, post_process: Arc<dyn PostProcess>) -> Self {
        self.post_process = Some(post_process);
        self
    }

    /// Attach an embed screenshot broker
    #[must_use]
    pub fn with_screenshot_broker(mut self, broker: Arc<ScreenshotBroker>) -> Self {
        self.screenshot = Some(broker);
        self
    }

    /// Attach an embed screenshot transport, brokered with the configured
    /// timeout
    #[must_use]
    pub fn with_screenshot_transport(self, transport: Arc<dyn FrameTransport>) -> Self {
        let timeout = Duration::from_secs(self.config.screenshot_timeout_secs);
        let broker = Arc::new(ScreenshotBroker::new(transport, timeout));
        self.with_screenshot_broker(broker)
    }

    /// Replace the avatar sink (default: console avatar)
    #[must_use]
    pub fn with_avatar(mut self, avatar: Arc<dyn AvatarSink>) -> Self {
        self.avatar = avatar;
        self
    }

    /// The session transcript
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The session playback queue
    #[must_use]
    pub fn queue(&self) -> &Arc<PlaybackQueue> {
        &self.queue
    }

    /// Conversation identifier from the most recent completed response
    #[must_use]
    pub fn conversation_id(&self) -> Option<String> {
        self.conversation_id.lock().expect("conversation lock").clone()
    }

    /// Apply the configured character to the avatar
    ///
    /// # Errors
    ///
    /// Returns error if the avatar rejects the character
    pub fn prepare_avatar(&self) -> Result<()> {
        if let Some(character) = &self.config.character {
            self.avatar.change_character(character)?;
        }
        if !self.avatar.is_ready() {
            return Err(Error::Avatar("avatar failed to become ready".to_string()));
        }
        Ok(())
    }

    /// Send a user message and process the full response
    ///
    /// Supersedes any in-flight request (queued audio keeps playing). When an
    /// embed broker is attached, a screenshot is requested first; on timeout
    /// or failure the message is sent without one. Returns after the event
    /// stream ends — speech synthesis of the tail may still be running, and
    /// queued audio drains on its own.
    pub async fn send(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        self.abort();

        self.transcript.push(ChatRecord {
            role: ChatRole::Human,
            think: String::new(),
            content: text.to_string(),
        });
        self.transcript.push(ChatRecord {
            role: ChatRole::Assistant,
            think: String::new(),
            content: PENDING_PLACEHOLDER.to_string(),
        });

        let screenshot = match &self.screenshot {
            Some(broker) => broker.request_screenshot().await,
            None => None,
        };

        let request = ChatStreamRequest {
            prompt: text.to_string(),
            conversation_id: self.conversation_id(),
            screenshot,
        };

        let events = match self.agent.stream_chat(&request).await {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "failed to open agent stream");
                self.display.update(ChatRole::Assistant, "", ERROR_MESSAGE);
                return;
            }
        };

        self.process_stream(events).await;
    }

    /// Route a stream of events through the session
    ///
    /// This is the tail of [`Self::send`], split out so hosts and tests can
    /// drive the session with synthetic event streams.
    pub async fn process_stream<S>(&self, events: S)
    where
        S: Stream<Item = Result<StreamEvent>> + Send,
    {
        let request_id = uuid::Uuid::new_v4();
        tracing::debug!(request_id = %request_id, "processing response stream");

        let live = Arc::new(AtomicBool::new(true));
        let acc: SharedAccumulator = Arc::new(Mutex::new(ResponseAccumulator::new()));

        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        {
            let mut active = self.active.lock().expect("active lock");
            *active = Some(ActiveRequest {
                live: Arc::clone(&live),
                abort: abort_handle,
                speech: None,
            });
        }

        let speech_wanted = self.config.voice.sound;
        let mut router = EventRouter::new(
            Arc::clone(&acc),
            Arc::clone(&self.display),
            Arc::clone(&live),
            speech_wanted,
        );
        if let Some(post) = &self.post_process {
            router = router.with_post_process(Arc::clone(post));
        }

        let events = Abortable::new(events, abort_registration);
        pin_mut!(events);

        while let Some(item) = events.next().await {
            match item {
                Ok(event) => {
                    if router.route(&event) {
                        self.spawn_speech(&live, &acc);
                    }
                }
                Err(e) => {
                    // One fixed error message per failed request; the guard
                    // keeps a superseded request from overwriting newer state.
                    tracing::warn!(error = %e, "agent stream transport error");
                    if live.load(Ordering::Acquire) {
                        self.display.update(ChatRole::Assistant, "", ERROR_MESSAGE);
                    }
                    break;
                }
            }
        }

        if live.load(Ordering::Acquire) {
            if let Some(id) = acc.lock().expect("accumulator lock").conversation_id() {
                *self.conversation_id.lock().expect("conversation lock") = Some(id.to_string());
            }
        }

        // A stream that ended without `Done` (transport failure, early close)
        // leaves the speech loop polling for text that will never arrive;
        // stop it. After a normal completion the loop drains the tail and
        // exits on its own.
        if !acc.lock().expect("accumulator lock").stream_done() {
            let mut active = self.active.lock().expect("active lock");
            if let Some(request) = active.as_mut() {
                if Arc::ptr_eq(&request.live, &live) {
                    if let Some(speech) = request.speech.take() {
                        speech.abort();
                    }
                }
            }
        }
    }

    /// Start the speech pipeline for the active request
    fn spawn_speech(&self, live: &Arc<AtomicBool>, acc: &SharedAccumulator) {
        let segmenter = SentenceSegmenter::new(
            &self.config.voice.punctuation,
            self.config.voice.min_sentence_len,
        );
        let pipeline = SpeechPipeline::new(
            segmenter,
            Arc::clone(&self.synthesizer),
            Arc::clone(&self.queue),
            Arc::clone(acc),
            Arc::clone(live),
        );
        let handle = tokio::spawn(pipeline.run());

        let mut active = self.active.lock().expect("active lock");
        match active.as_mut() {
            Some(request) if Arc::ptr_eq(&request.live, live) => {
                request.speech = Some(handle);
            }
            _ => {
                // The request was superseded between routing and spawning.
                handle.abort();
            }
        }
    }

    /// Supersede the in-flight request, if any
    ///
    /// Aborts the network stream and the speech pipeline. Queued and playing
    /// audio are left alone — stopping them is a separate, explicit action
    /// ([`Self::stop_audio`]).
    pub fn abort(&self) {
        let Some(request) = self.active.lock().expect("active lock").take() else {
            return;
        };
        request.live.store(false, Ordering::Release);
        request.abort.abort();
        if let Some(speech) = request.speech {
            speech.abort();
        }
        tracing::debug!("superseded in-flight request");
    }

    /// Stop all audio output immediately (barge-in)
    pub fn stop_audio(&self) {
        self.queue.stop_all();
    }

    /// Begin a voice turn: recording implies superseding the prior request
    ///
    /// Matches the default barge-in behavior — generation and synthesis stop,
    /// already-queued audio keeps playing.
    pub fn begin_voice_turn(&self) {
        self.abort();
    }

    /// Complete a voice turn with captured WAV audio
    ///
    /// Runs speech recognition; an empty result silently clears the turn.
    /// Returns the recognized text that was sent, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the recognition request fails
    pub async fn complete_voice_turn(&self, wav: Vec<u8>) -> Result<Option<String>> {
        let text = self.asr.transcribe(wav).await?;
        if text.trim().is_empty() {
            tracing::debug!("recognition returned no text, clearing input");
            return Ok(None);
        }

        self.send(&text).await;
        Ok(Some(text))
    }
}
