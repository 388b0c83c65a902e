//! Sentio Gateway - streaming speech gateway for digital-human assistants
//!
//! This library provides the core functionality for the Sentio gateway:
//! - Streaming agent chat (SSE event routing and accumulation)
//! - Incremental sentence segmentation for speech synthesis
//! - Ordered audio playback through an avatar/speaker sink
//! - Voice input (capture, speech recognition)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Inputs                            │
//! │    Console text  │  Microphone  │  Embed host       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Chat Session                         │
//! │  Event Router │ Segmenter │ Playback Queue │ ASR    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              External services                       │
//! │    Agent stream  │  TTS  │  STT  │  Avatar          │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod asr;
pub mod audio;
pub mod avatar;
pub mod config;
pub mod embed;
pub mod error;
pub mod session;
pub mod transcript;
pub mod tts;

pub use agent::{
    AgentClient, ChatStreamRequest, EventRouter, PostProcess, ResponseAccumulator,
    SharedAccumulator, StreamEvent,
};
pub use asr::AsrClient;
pub use audio::{
    AudioRenderer, DecodedAudio, MicCapture, PlaybackQueue, SpeakerRenderer, decode_mp3,
    samples_to_wav,
};
pub use avatar::{AvatarSink, ConsoleAvatar};
pub use config::Config;
pub use embed::{
    FrameMessage, FrameTransport, ScreenshotBroker, ScreenshotRequest, ScreenshotResponse,
};
pub use error::{Error, Result};
pub use session::{ChatSession, SpeechPipeline};
pub use transcript::{ChatRecord, ChatRole, DisplaySink, Transcript, TranscriptSink};
pub use tts::{
    SegmenterStep, SentenceSegmenter, SpeechSynthesizer, TtsClient, TtsSynthesizer,
    prepare_for_speech,
};
