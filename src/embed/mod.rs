//! Embed host screenshot protocol
//!
//! When the gateway runs embedded in a host page/application, a chat message
//! can carry a screenshot of the host. The request/response message pair is
//! exchanged over an opaque transport (cross-document messaging in browsers,
//! an IPC channel elsewhere). The requester enforces a timeout and proceeds
//! without the screenshot on any failure — a missing screenshot never blocks
//! the chat message.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::{Error, Result};

/// Screenshot request sent to the embed host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotRequest {
    /// Milliseconds since the epoch; doubles as the correlation key
    pub timestamp: i64,
    /// Requester identity
    pub source: String,
}

/// Screenshot response from the embed host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotResponse {
    /// Whether the host captured an image
    pub success: bool,
    /// PNG data URL when `success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    /// Failure description when not `success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Milliseconds since the epoch
    pub timestamp: i64,
    /// Echo of the request being answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_request: Option<ScreenshotRequest>,
}

/// Envelope for messages crossing the embed boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FrameMessage {
    /// Gateway → host
    #[serde(rename = "SCREENSHOT_REQUEST")]
    ScreenshotRequest(ScreenshotRequest),
    /// Host → gateway
    #[serde(rename = "SCREENSHOT_RESPONSE")]
    ScreenshotResponse(ScreenshotResponse),
}

/// Posts messages to the embed host
pub trait FrameTransport: Send + Sync {
    /// Deliver one message to the host
    ///
    /// # Errors
    ///
    /// Returns error if the transport is closed
    fn post(&self, message: &FrameMessage) -> Result<()>;
}

/// Identity string stamped on outgoing requests
const REQUEST_SOURCE: &str = "sentio-gateway";

/// One pending screenshot request
struct PendingRequest {
    timestamp: i64,
    reply: oneshot::Sender<ScreenshotResponse>,
}

/// Requests screenshots from the embed host with a bounded wait
pub struct ScreenshotBroker {
    transport: Arc<dyn FrameTransport>,
    pending: Mutex<Option<PendingRequest>>,
    timeout: Duration,
}

impl ScreenshotBroker {
    /// Create a broker over `transport` with the given timeout
    #[must_use]
    pub fn new(transport: Arc<dyn FrameTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            pending: Mutex::new(None),
            timeout,
        }
    }

    /// Request a screenshot from the host
    ///
    /// Resolves to `Some(data_url)` on success, `None` on timeout, host
    /// failure, or transport failure — the caller proceeds either way.
    pub async fn request_screenshot(&self) -> Option<String> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock().expect("pending lock");
            // A newer request supersedes an unanswered older one; the old
            // waiter sees a closed channel and proceeds without.
            *pending = Some(PendingRequest {
                timestamp,
                reply: tx,
            });
        }

        let request = ScreenshotRequest {
            timestamp,
            source: REQUEST_SOURCE.to_string(),
        };
        if let Err(e) = self.transport.post(&FrameMessage::ScreenshotRequest(request)) {
            tracing::warn!(error = %e, "screenshot request could not be posted");
            self.pending.lock().expect("pending lock").take();
            return None;
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) if response.success => {
                if response.image_data.is_none() {
                    tracing::warn!("screenshot response succeeded without image data");
                }
                response.image_data
            }
            Ok(Ok(response)) => {
                tracing::warn!(
                    error = response.error.as_deref().unwrap_or("unknown"),
                    "host screenshot failed"
                );
                None
            }
            Ok(Err(_)) => {
                tracing::debug!("screenshot request superseded");
                None
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "screenshot request timed out");
                self.pending.lock().expect("pending lock").take();
                None
            }
        }
    }

    /// Deliver a host message to the broker
    ///
    /// Responses are matched to the pending request by the echoed request
    /// timestamp; a response with no echo answers whatever is pending.
    /// Unmatched or duplicate responses are dropped.
    ///
    /// # Errors
    ///
    /// Returns error for request-direction messages, which the broker never
    /// receives
    pub fn handle_message(&self, message: FrameMessage) -> Result<()> {
        match message {
            FrameMessage::ScreenshotResponse(response) => {
                let mut pending = self.pending.lock().expect("pending lock");
                let matches = pending.as_ref().is_some_and(|p| {
                    response
                        .original_request
                        .as_ref()
                        .is_none_or(|orig| orig.timestamp == p.timestamp)
                });
                if matches {
                    if let Some(p) = pending.take() {
                        let _ = p.reply.send(response);
                    }
                } else {
                    tracing::debug!("dropping unmatched screenshot response");
                }
                Ok(())
            }
            FrameMessage::ScreenshotRequest(_) => Err(Error::Screenshot(
                "unexpected request-direction message".to_string(),
            )),
        }
    }
}
