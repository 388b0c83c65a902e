//! Agent stream handling
//!
//! Client, typed events, and the router that turns one inbound event stream
//! into accumulator mutations and display updates.

mod client;
mod events;
mod router;

pub use client::{AgentClient, ChatStreamRequest};
pub use events::{SseDecoder, StreamEvent};
pub use router::{
    ERROR_MESSAGE, EventRouter, NO_REPLY_FALLBACK, PostProcess, ResponseAccumulator,
    SharedAccumulator, THINKING_PLACEHOLDER,
};
