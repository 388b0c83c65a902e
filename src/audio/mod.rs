//! Audio processing
//!
//! Decode, ordered playback, speaker rendering, and microphone capture.

mod capture;
mod decode;
mod playback;
mod queue;

pub use capture::{CAPTURE_SAMPLE_RATE, MicCapture, samples_to_wav};
pub use decode::{DecodedAudio, decode_mp3};
pub use playback::SpeakerRenderer;
pub use queue::{AudioRenderer, PlaybackQueue};
