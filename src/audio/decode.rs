//! Audio payload decoding
//!
//! MP3 payloads from speech synthesis are decoded to mono f32 samples before
//! queueing. Decoding always works on a private copy of the input so the
//! original bytes stay available for diagnostics.

use std::io::Cursor;

use crate::{Error, Result};

/// Decoded audio ready for playback
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Mono samples in `[-1.0, 1.0]`
    pub samples: Vec<f32>,
    /// Source sample rate in Hz
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Duration of the audio in milliseconds
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / u64::from(self.sample_rate)
    }
}

/// Decode MP3 bytes to mono f32 samples
///
/// Stereo input is averaged down to mono. The decode consumes a copy of
/// `mp3_data`; the caller's buffer is not touched.
///
/// # Errors
///
/// Returns error if the payload contains no decodable frames
pub fn decode_mp3(mp3_data: &[u8]) -> Result<DecodedAudio> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data.to_vec()));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                #[allow(clippy::cast_sign_loss)]
                if sample_rate == 0 && frame.sample_rate > 0 {
                    sample_rate = frame.sample_rate as u32;
                }

                let frame_samples: Vec<f32> = if frame.channels == 2 {
                    frame
                        .data
                        .chunks(2)
                        .map(|chunk| {
                            let left = f32::from(chunk[0]) / 32768.0;
                            let right =
                                f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                            f32::midpoint(left, right)
                        })
                        .collect()
                } else {
                    frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect()
                };

                samples.extend(frame_samples);
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Decode(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() || sample_rate == 0 {
        return Err(Error::Decode("no decodable audio frames".to_string()));
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let result = decode_mp3(&[0x00, 0x01, 0x02, 0x03]);
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn source_buffer_is_untouched_by_decode() {
        let original = vec![0xFFu8, 0xFB, 0x90, 0x00, 0x12, 0x34];
        let copy = original.clone();
        let _ = decode_mp3(&original);
        assert_eq!(original, copy);
    }

    #[test]
    fn duration_is_derived_from_rate() {
        let audio = DecodedAudio {
            samples: vec![0.0; 24000],
            sample_rate: 24000,
        };
        assert_eq!(audio.duration_ms(), 1000);

        let empty = DecodedAudio {
            samples: Vec::new(),
            sample_rate: 0,
        };
        assert_eq!(empty.duration_ms(), 0);
    }
}
