//! Stream event routing and response accumulation
//!
//! Demultiplexes one inbound event stream into accumulator mutations and
//! display-sink updates. One [`ResponseAccumulator`] exists per request; it
//! is created when the user message is sent and superseded when the request
//! completes or is cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::transcript::{ChatRole, DisplaySink};

use super::events::StreamEvent;

/// Placeholder shown while the agent is reasoning but has produced no answer yet
pub const THINKING_PLACEHOLDER: &str = "思考中...";

/// Fallback shown when the stream completes without any answer text
pub const NO_REPLY_FALLBACK: &str = "抱歉，没有收到有效回复。";

/// Fixed user-facing message for a failed response
pub const ERROR_MESSAGE: &str = "抱歉，发生了错误，请重试。";

/// Accumulated state of one streaming response
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    conversation_id: Option<String>,
    message_id: Option<String>,
    think_text: String,
    response_text: String,
    tts_cursor: usize,
    stream_done: bool,
}

impl ResponseAccumulator {
    /// Create an empty accumulator for a new request
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation identifier received from the stream, if any
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Message identifier received from the stream, if any
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Accumulated reasoning text
    #[must_use]
    pub fn think_text(&self) -> &str {
        &self.think_text
    }

    /// Accumulated answer text
    #[must_use]
    pub fn response_text(&self) -> &str {
        &self.response_text
    }

    /// Byte index of the first answer char not yet dispatched to synthesis
    #[must_use]
    pub const fn tts_cursor(&self) -> usize {
        self.tts_cursor
    }

    /// Whether the stream has completed
    #[must_use]
    pub const fn stream_done(&self) -> bool {
        self.stream_done
    }

    /// Whether answer text beyond the cursor is waiting for synthesis
    #[must_use]
    pub fn has_unprocessed_text(&self) -> bool {
        self.tts_cursor < self.response_text.len()
    }

    /// Advance the synthesis cursor
    ///
    /// The cursor is monotone and clamped to the buffer length; a stale or
    /// backwards position is ignored.
    pub fn advance_cursor(&mut self, to: usize) {
        if to > self.tts_cursor {
            self.tts_cursor = to.min(self.response_text.len());
        }
    }
}

/// Shared handle on a request's accumulator
///
/// The router mutates it as events arrive; the speech pipeline reads the
/// buffer and advances the cursor. Interleaving is cooperative: both sides
/// take the lock only for short, non-blocking sections.
pub type SharedAccumulator = Arc<Mutex<ResponseAccumulator>>;

/// Receives the final response after the stream completes
pub trait PostProcess: Send + Sync {
    /// Called once per request after the `Done` event
    fn on_complete(&self, conversation_id: &str, think: &str, content: &str);
}

/// Routes stream events into accumulator mutations and display updates
pub struct EventRouter {
    acc: SharedAccumulator,
    display: Arc<dyn DisplaySink>,
    post_process: Option<Arc<dyn PostProcess>>,
    /// Cleared when the request is superseded; a dead router stops mutating
    live: Arc<AtomicBool>,
    /// Set once the first answer delta arrives (starts the speech pipeline)
    speech_wanted: bool,
    speech_started: bool,
}

impl EventRouter {
    /// Create a router for one request
    #[must_use]
    pub fn new(
        acc: SharedAccumulator,
        display: Arc<dyn DisplaySink>,
        live: Arc<AtomicBool>,
        speech_wanted: bool,
    ) -> Self {
        Self {
            acc,
            display,
            post_process: None,
            live,
            speech_wanted,
            speech_started: false,
        }
    }

    /// Register a post-processing collaborator for the final response
    #[must_use]
    pub fn with_post_process(mut self, post_process: Arc<dyn PostProcess>) -> Self {
        self.post_process = Some(post_process);
        self
    }

    /// Whether the first answer delta has arrived and speech should run
    #[must_use]
    pub const fn speech_started(&self) -> bool {
        self.speech_started
    }

    /// Process one stream event
    ///
    /// Returns `true` if this event started the speech pipeline (first
    /// non-empty answer delta with speech enabled).
    pub fn route(&mut self, event: &StreamEvent) -> bool {
        // Events may trail in after cancellation; a superseded request must
        // not touch shared display state.
        if !self.live.load(Ordering::Acquire) {
            tracing::debug!(?event, "dropping event for superseded request");
            return false;
        }

        match event {
            StreamEvent::ConversationId(id) => {
                self.acc.lock().expect("accumulator lock").conversation_id = Some(id.clone());
                false
            }
            StreamEvent::MessageId(id) => {
                self.acc.lock().expect("accumulator lock").message_id = Some(id.clone());
                false
            }
            StreamEvent::ThinkingDelta(delta) => {
                if delta.trim().is_empty() {
                    return false;
                }
                let (think, content) = {
                    let mut acc = self.acc.lock().expect("accumulator lock");
                    acc.think_text.push_str(delta);
                    let content = if acc.response_text.is_empty() {
                        THINKING_PLACEHOLDER.to_string()
                    } else {
                        acc.response_text.clone()
                    };
                    (acc.think_text.clone(), content)
                };
                self.display.update(ChatRole::Assistant, &think, &content);
                false
            }
            StreamEvent::TextDelta(delta) => {
                if delta.trim().is_empty() {
                    return false;
                }
                let (think, content) = {
                    let mut acc = self.acc.lock().expect("accumulator lock");
                    acc.response_text.push_str(delta);
                    (acc.think_text.clone(), acc.response_text.clone())
                };
                self.display.update(ChatRole::Assistant, &think, &content);

                if self.speech_wanted && !self.speech_started {
                    self.speech_started = true;
                    return true;
                }
                false
            }
            StreamEvent::Done => {
                let (conversation_id, think, content) = {
                    let mut acc = self.acc.lock().expect("accumulator lock");
                    acc.stream_done = true;
                    (
                        acc.conversation_id.clone().unwrap_or_default(),
                        acc.think_text.clone(),
                        acc.response_text.clone(),
                    )
                };

                let trimmed = content.trim();
                if trimmed.is_empty() {
                    self.display.update(ChatRole::Assistant, "", NO_REPLY_FALLBACK);
                } else {
                    self.display.update(ChatRole::Assistant, "", trimmed);
                }

                if let Some(post) = &self.post_process {
                    post.on_complete(&conversation_id, &think, &content);
                }
                false
            }
            StreamEvent::Error(description) => {
                tracing::warn!(error = %description, "agent stream reported an error");
                self.display.update(ChatRole::Assistant, "", ERROR_MESSAGE);
                false
            }
            StreamEvent::Unknown { event } => {
                tracing::debug!(event = %event, "ignoring unrecognized stream event");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<(String, String)>>,
    }

    impl DisplaySink for RecordingSink {
        fn update(&self, _role: ChatRole, think: &str, content: &str) {
            self.updates
                .lock()
                .unwrap()
                .push((think.to_string(), content.to_string()));
        }
    }

    fn router_with_sink(speech: bool) -> (EventRouter, SharedAccumulator, Arc<RecordingSink>) {
        let acc: SharedAccumulator = Arc::new(Mutex::new(ResponseAccumulator::new()));
        let sink = Arc::new(RecordingSink::default());
        let live = Arc::new(AtomicBool::new(true));
        let router = EventRouter::new(Arc::clone(&acc), sink.clone(), live, speech);
        (router, acc, sink)
    }

    #[test]
    fn text_deltas_concatenate_in_arrival_order() {
        let (mut router, acc, _sink) = router_with_sink(false);
        for delta in ["Hello", " ", "world", "!"] {
            router.route(&StreamEvent::TextDelta(delta.to_string()));
        }
        // Whitespace-only payloads are no-ops, all others append in order.
        assert_eq!(acc.lock().unwrap().response_text(), "Helloworld!");
    }

    #[test]
    fn whitespace_delta_is_a_noop() {
        let (mut router, acc, sink) = router_with_sink(false);
        router.route(&StreamEvent::TextDelta("  \n ".to_string()));
        assert_eq!(acc.lock().unwrap().response_text(), "");
        assert!(sink.updates.lock().unwrap().is_empty());
    }

    #[test]
    fn thinking_shows_placeholder_until_text_arrives() {
        let (mut router, _acc, sink) = router_with_sink(false);
        router.route(&StreamEvent::ThinkingDelta("pondering".to_string()));
        {
            let updates = sink.updates.lock().unwrap();
            assert_eq!(updates.last().unwrap().1, THINKING_PLACEHOLDER);
        }

        router.route(&StreamEvent::TextDelta("answer".to_string()));
        router.route(&StreamEvent::ThinkingDelta(" more".to_string()));
        let updates = sink.updates.lock().unwrap();
        assert_eq!(updates.last().unwrap().1, "answer");
        assert_eq!(updates.last().unwrap().0, "pondering more");
    }

    #[test]
    fn first_text_delta_starts_speech_once() {
        let (mut router, _acc, _sink) = router_with_sink(true);
        assert!(!router.route(&StreamEvent::ThinkingDelta("t".to_string())));
        assert!(router.route(&StreamEvent::TextDelta("a".to_string())));
        assert!(!router.route(&StreamEvent::TextDelta("b".to_string())));
        assert!(router.speech_started());
    }

    #[test]
    fn done_trims_and_clears_think() {
        let (mut router, acc, sink) = router_with_sink(false);
        router.route(&StreamEvent::ThinkingDelta("think".to_string()));
        router.route(&StreamEvent::TextDelta("  reply  ".to_string()));
        router.route(&StreamEvent::Done);

        assert!(acc.lock().unwrap().stream_done());
        let updates = sink.updates.lock().unwrap();
        let last = updates.last().unwrap();
        assert_eq!(last.0, "");
        assert_eq!(last.1, "reply");
    }

    #[test]
    fn done_without_text_shows_fallback() {
        let (mut router, _acc, sink) = router_with_sink(false);
        router.route(&StreamEvent::Done);
        let updates = sink.updates.lock().unwrap();
        assert_eq!(updates.last().unwrap().1, NO_REPLY_FALLBACK);
    }

    #[test]
    fn error_after_done_keeps_response_text() {
        let (mut router, acc, sink) = router_with_sink(false);
        router.route(&StreamEvent::TextDelta("final answer.".to_string()));
        router.route(&StreamEvent::Done);
        router.route(&StreamEvent::Error("late failure".to_string()));

        // Display shows the fixed error message, but accumulated state is
        // unchanged and stream_done is still set.
        let acc = acc.lock().unwrap();
        assert_eq!(acc.response_text(), "final answer.");
        assert!(acc.stream_done());
        let updates = sink.updates.lock().unwrap();
        assert_eq!(updates.last().unwrap().1, ERROR_MESSAGE);
    }

    #[test]
    fn error_does_not_set_stream_done() {
        let (mut router, acc, _sink) = router_with_sink(false);
        router.route(&StreamEvent::Error("boom".to_string()));
        assert!(!acc.lock().unwrap().stream_done());
    }

    #[test]
    fn unknown_event_mutates_nothing() {
        let (mut router, acc, sink) = router_with_sink(false);
        router.route(&StreamEvent::Unknown {
            event: "usage".to_string(),
        });
        assert_eq!(acc.lock().unwrap().response_text(), "");
        assert!(sink.updates.lock().unwrap().is_empty());
    }

    #[test]
    fn dead_router_drops_events() {
        let acc: SharedAccumulator = Arc::new(Mutex::new(ResponseAccumulator::new()));
        let sink = Arc::new(RecordingSink::default());
        let live = Arc::new(AtomicBool::new(true));
        let mut router = EventRouter::new(Arc::clone(&acc), sink.clone(), Arc::clone(&live), false);

        router.route(&StreamEvent::TextDelta("kept".to_string()));
        live.store(false, Ordering::Release);
        router.route(&StreamEvent::TextDelta(" dropped".to_string()));
        router.route(&StreamEvent::Done);

        let acc = acc.lock().unwrap();
        assert_eq!(acc.response_text(), "kept");
        assert!(!acc.stream_done());
    }

    #[test]
    fn post_process_receives_final_state() {
        struct Capture(Mutex<Option<(String, String, String)>>);
        impl PostProcess for Capture {
            fn on_complete(&self, conversation_id: &str, think: &str, content: &str) {
                *self.0.lock().unwrap() = Some((
                    conversation_id.to_string(),
                    think.to_string(),
                    content.to_string(),
                ));
            }
        }

        let acc: SharedAccumulator = Arc::new(Mutex::new(ResponseAccumulator::new()));
        let sink = Arc::new(RecordingSink::default());
        let live = Arc::new(AtomicBool::new(true));
        let capture = Arc::new(Capture(Mutex::new(None)));
        let mut router = EventRouter::new(acc, sink, live, false)
            .with_post_process(capture.clone());

        router.route(&StreamEvent::ConversationId("c9".to_string()));
        router.route(&StreamEvent::ThinkingDelta("t".to_string()));
        router.route(&StreamEvent::TextDelta("answer".to_string()));
        router.route(&StreamEvent::Done);

        let captured = capture.0.lock().unwrap().clone().unwrap();
        assert_eq!(captured, ("c9".to_string(), "t".to_string(), "answer".to_string()));
    }

    #[test]
    fn cursor_is_clamped_and_monotone() {
        let mut acc = ResponseAccumulator::new();
        acc.response_text = "hello".to_string();
        acc.advance_cursor(3);
        assert_eq!(acc.tts_cursor(), 3);
        acc.advance_cursor(2);
        assert_eq!(acc.tts_cursor(), 3);
        acc.advance_cursor(99);
        assert_eq!(acc.tts_cursor(), 5);
    }
}
