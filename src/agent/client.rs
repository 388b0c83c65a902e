//! Streaming agent chat client
//!
//! Opens a cancellable SSE request against the agent service and yields
//! typed [`StreamEvent`]s in network order.

use futures::stream::BoxStream;
use futures::{StreamExt, stream};
use serde::Serialize;

use crate::config::AgentConfig;
use crate::{Error, Result};

use super::events::{SseDecoder, StreamEvent};

/// Parameters of one streaming chat request
#[derive(Debug, Clone, Default)]
pub struct ChatStreamRequest {
    /// The user's prompt
    pub prompt: String,
    /// Prior conversation identifier, if continuing a conversation
    pub conversation_id: Option<String>,
    /// Optional screenshot data URL riding along as auxiliary payload
    pub screenshot: Option<String>,
}

/// Wire body of the stream request
#[derive(Debug, Serialize)]
struct StreamRequestBody<'a> {
    engine: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
}

/// Client for the agent's streaming chat endpoint
pub struct AgentClient {
    client: reqwest::Client,
    config: AgentConfig,
}

impl AgentClient {
    /// Create a new agent client
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Open a streaming chat request
    ///
    /// The returned stream yields events in arrival order and ends when the
    /// server closes the response. Cancellation is the caller's concern —
    /// wrap the stream in `futures::stream::Abortable` and drop or abort it.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be issued or the server rejects it.
    pub async fn stream_chat(
        &self,
        request: &ChatStreamRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let body = StreamRequestBody {
            engine: &self.config.engine,
            message: &request.prompt,
            conversation_id: request.conversation_id.as_deref(),
            image: request.screenshot.as_deref(),
        };

        let url = format!("{}/agent/stream", self.config.base_url);
        let mut builder = self
            .client
            .post(&url)
            .header("Accept", "text/event-stream")
            .json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Agent(format!("agent stream error {status}: {text}")));
        }

        tracing::debug!(url = %url, "agent stream opened");

        let mut decoder = SseDecoder::new();
        let events = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => decoder.feed(&bytes).into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(Error::Http(e))],
            })
            .flat_map(stream::iter)
            .boxed();

        Ok(events)
    }
}
