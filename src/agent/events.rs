//! Typed events of the agent response stream
//!
//! The agent service speaks server-sent events; each frame's data payload is
//! a JSON object `{"event": "<tag>", "data": <string>}`. Tags are mapped into
//! a closed variant set here — unrecognized tags become [`StreamEvent::Unknown`]
//! so they can be logged without ever mutating accumulator or display state.

use serde::Deserialize;

/// One unit of a server-to-client incremental response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Conversation identifier for follow-up correlation
    ConversationId(String),
    /// Message identifier
    MessageId(String),
    /// Incremental reasoning text
    ThinkingDelta(String),
    /// Incremental answer text
    TextDelta(String),
    /// The stream completed normally
    Done,
    /// The server reported an error
    Error(String),
    /// Unrecognized server tag; ignored by the router
    Unknown {
        /// The tag as received from the wire
        event: String,
    },
}

/// Wire shape of one SSE data payload
#[derive(Debug, Deserialize)]
struct WireEvent {
    event: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl StreamEvent {
    /// Map a wire tag + payload into a typed event
    ///
    /// Tags are matched case-insensitively and include the aliases the agent
    /// service has used across protocol revisions.
    #[must_use]
    pub fn from_wire(event: &str, data: Option<&str>) -> Self {
        let payload = || data.unwrap_or_default().to_string();

        match event.to_ascii_lowercase().as_str() {
            "conversation_id" => Self::ConversationId(payload()),
            "message_id" => Self::MessageId(payload()),
            "agent_thinking" | "think" => Self::ThinkingDelta(payload()),
            "agent_response" | "text" => Self::TextDelta(payload()),
            "task" | "done" => Self::Done,
            "error" => Self::Error(payload()),
            _ => Self::Unknown {
                event: event.to_string(),
            },
        }
    }

    /// Parse one SSE `data:` payload (a JSON-encoded wire event)
    ///
    /// Payloads that are not valid wire events are surfaced as [`Self::Unknown`]
    /// rather than an error: a malformed frame must not kill the stream.
    #[must_use]
    pub fn from_json(payload: &str) -> Self {
        match serde_json::from_str::<WireEvent>(payload) {
            Ok(wire) => {
                let data = wire.data.as_ref().and_then(|v| v.as_str().map(str::to_owned));
                Self::from_wire(&wire.event, data.as_deref())
            }
            Err(e) => {
                tracing::debug!(error = %e, "unparseable stream payload");
                Self::Unknown {
                    event: "unparseable".to_string(),
                }
            }
        }
    }
}

/// Incremental decoder for SSE frames
///
/// Feeds arbitrary byte chunks, yields the `data:` payload of each completed
/// frame (frames are separated by a blank line). Comment lines and other SSE
/// fields are skipped; multiple `data:` lines in one frame are joined with
/// newlines per the SSE spec.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: String,
}

impl SseDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes; returns the events completed by this chunk
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        // A frame ends at a blank line. Handle \r\n line endings by normalizing.
        while let Some(pos) = find_frame_end(&self.buf) {
            let frame = self.buf[..pos.start].to_string();
            self.buf.drain(..pos.end);
            if let Some(payload) = frame_data(&frame) {
                events.push(StreamEvent::from_json(&payload));
            }
        }
        events
    }
}

/// Byte range of the next complete frame: `start` is the frame length,
/// `end` includes the blank-line separator.
fn find_frame_end(buf: &str) -> Option<std::ops::Range<usize>> {
    let lf = buf.find("\n\n").map(|i| (i, i + 2));
    let crlf = buf.find("\r\n\r\n").map(|i| (i, i + 4));
    match (lf, crlf) {
        (Some((a, ae)), Some((b, _))) if a < b => Some(a..ae),
        (_, Some((b, be))) => Some(b..be),
        (Some((a, ae)), None) => Some(a..ae),
        (None, None) => None,
    }
}

/// Extract and join the `data:` lines of one frame
fn frame_data(frame: &str) -> Option<String> {
    let mut data_lines = Vec::new();
    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_tags() {
        assert_eq!(
            StreamEvent::from_wire("conversation_id", Some("c1")),
            StreamEvent::ConversationId("c1".to_string())
        );
        assert_eq!(
            StreamEvent::from_wire("TEXT", Some("hi")),
            StreamEvent::TextDelta("hi".to_string())
        );
        assert_eq!(
            StreamEvent::from_wire("agent_thinking", Some("hmm")),
            StreamEvent::ThinkingDelta("hmm".to_string())
        );
        assert_eq!(StreamEvent::from_wire("DONE", None), StreamEvent::Done);
        assert_eq!(StreamEvent::from_wire("task", None), StreamEvent::Done);
        assert_eq!(
            StreamEvent::from_wire("error", Some("boom")),
            StreamEvent::Error("boom".to_string())
        );
    }

    #[test]
    fn unknown_tag_is_preserved_not_dropped() {
        let event = StreamEvent::from_wire("usage", Some("{}"));
        assert_eq!(
            event,
            StreamEvent::Unknown {
                event: "usage".to_string()
            }
        );
    }

    #[test]
    fn parses_json_payload() {
        let event = StreamEvent::from_json(r#"{"event":"text","data":"hello"}"#);
        assert_eq!(event, StreamEvent::TextDelta("hello".to_string()));
    }

    #[test]
    fn malformed_payload_becomes_unknown() {
        let event = StreamEvent::from_json("not json");
        assert!(matches!(event, StreamEvent::Unknown { .. }));
    }

    #[test]
    fn decoder_yields_events_across_chunk_boundaries() {
        let mut decoder = SseDecoder::new();

        let first = decoder.feed(b"data: {\"event\":\"text\",\"da");
        assert!(first.is_empty());

        let second = decoder.feed(b"ta\":\"hi\"}\n\ndata: {\"event\":\"done\"}\n\n");
        assert_eq!(
            second,
            vec![StreamEvent::TextDelta("hi".to_string()), StreamEvent::Done]
        );
    }

    #[test]
    fn decoder_handles_crlf_frames() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: {\"event\":\"done\"}\r\n\r\n");
        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[test]
    fn decoder_skips_comment_only_frames() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keep-alive\n\n");
        assert!(events.is_empty());
    }
}
