//! Chat transcript store
//!
//! Ordered record of the conversation shown to the user. The streaming
//! pipeline updates the last assistant record in place as deltas arrive.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Role of a chat participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    /// The human user
    Human,
    /// The assistant
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    /// Speaker role
    pub role: ChatRole,
    /// Reasoning text shown separately from the answer (may be empty)
    pub think: String,
    /// Message content
    pub content: String,
}

/// Receives display updates as the response streams in
///
/// Implementations render to a terminal, a UI, or a test buffer. Treated as
/// a pure consumer: it must not mutate pipeline state.
pub trait DisplaySink: Send + Sync {
    /// Replace the displayed state of the in-progress assistant message
    fn update(&self, role: ChatRole, think: &str, content: &str);
}

/// In-memory chat transcript shared between the session and its sinks
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    records: Arc<Mutex<Vec<ChatRecord>>>,
}

impl Transcript {
    /// Create an empty transcript
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub fn push(&self, record: ChatRecord) {
        self.records.lock().expect("transcript lock").push(record);
    }

    /// Replace the last record, if any
    pub fn update_last(&self, record: ChatRecord) {
        let mut records = self.records.lock().expect("transcript lock");
        if let Some(last) = records.last_mut() {
            *last = record;
        } else {
            records.push(record);
        }
    }

    /// Remove and return the last record
    pub fn delete_last(&self) -> Option<ChatRecord> {
        self.records.lock().expect("transcript lock").pop()
    }

    /// Clone of the last record, if any
    #[must_use]
    pub fn last(&self) -> Option<ChatRecord> {
        self.records.lock().expect("transcript lock").last().cloned()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().expect("transcript lock").len()
    }

    /// Whether the transcript is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all records
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChatRecord> {
        self.records.lock().expect("transcript lock").clone()
    }
}

/// Display sink that mirrors updates into the last transcript record
pub struct TranscriptSink {
    transcript: Transcript,
}

impl TranscriptSink {
    /// Create a sink writing into `transcript`
    #[must_use]
    pub const fn new(transcript: Transcript) -> Self {
        Self { transcript }
    }
}

impl DisplaySink for TranscriptSink {
    fn update(&self, role: ChatRole, think: &str, content: &str) {
        self.transcript.update_last(ChatRecord {
            role,
            think: think.to_string(),
            content: content.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_last_replaces_in_place() {
        let transcript = Transcript::new();
        transcript.push(ChatRecord {
            role: ChatRole::Human,
            think: String::new(),
            content: "hi".to_string(),
        });
        transcript.push(ChatRecord {
            role: ChatRole::Assistant,
            think: String::new(),
            content: "...".to_string(),
        });

        transcript.update_last(ChatRecord {
            role: ChatRole::Assistant,
            think: "working".to_string(),
            content: "hello".to_string(),
        });

        assert_eq!(transcript.len(), 2);
        let last = transcript.last().unwrap();
        assert_eq!(last.content, "hello");
        assert_eq!(last.think, "working");
    }

    #[test]
    fn update_last_on_empty_appends() {
        let transcript = Transcript::new();
        transcript.update_last(ChatRecord {
            role: ChatRole::Assistant,
            think: String::new(),
            content: "hello".to_string(),
        });
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn sink_writes_through() {
        let transcript = Transcript::new();
        transcript.push(ChatRecord {
            role: ChatRole::Assistant,
            think: String::new(),
            content: "...".to_string(),
        });

        let sink = TranscriptSink::new(transcript.clone());
        sink.update(ChatRole::Assistant, "", "streamed");

        assert_eq!(transcript.last().unwrap().content, "streamed");
    }
}
