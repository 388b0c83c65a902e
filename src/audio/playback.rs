//! Speaker output rendering
//!
//! cpal-based implementation of [`AudioRenderer`]: plays decoded buffers on
//! the default output device, resampling to the device rate when the source
//! rate differs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

use super::decode::DecodedAudio;
use super::queue::AudioRenderer;

/// Output sample rate (matches common TTS output)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Plays audio on the default output device
pub struct SpeakerRenderer {
    config: StreamConfig,
    halted: Arc<AtomicBool>,
}

impl SpeakerRenderer {
    /// Create a renderer bound to the default output device
    ///
    /// # Errors
    ///
    /// Returns error if no output device or suitable config is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "speaker renderer initialized"
        );

        Ok(Self {
            config,
            halted: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Play samples on the output device, blocking until done or halted
    fn play_samples_blocking(&self, samples: Vec<f32>) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device".to_string()))?;

        let config = self.config.clone();
        let channels = config.channels as usize;

        let sample_count = samples.len();
        let position = Arc::new(Mutex::new(0usize));
        let finished = Arc::new(AtomicBool::new(false));
        let samples = Arc::new(samples);

        let samples_cb = Arc::clone(&samples);
        let position_cb = Arc::clone(&position);
        let finished_cb = Arc::clone(&finished);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = position_cb.lock().expect("position lock");

                    for frame in data.chunks_mut(channels) {
                        let sample = if *pos < samples_cb.len() {
                            samples_cb[*pos]
                        } else {
                            finished_cb.store(true, Ordering::Release);
                            0.0
                        };

                        for out in frame.iter_mut() {
                            *out = sample;
                        }

                        if *pos < samples_cb.len() {
                            *pos += 1;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(duration_ms + 500);

        while !finished.load(Ordering::Acquire) {
            if self.halted.load(Ordering::Acquire) {
                tracing::debug!("playback halted mid-buffer");
                break;
            }
            if start.elapsed() > timeout {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        // Let the device drain before tearing the stream down
        if !self.halted.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(100));
        }

        drop(stream);
        tracing::debug!(samples = sample_count, "playback finished");

        Ok(())
    }
}

#[async_trait]
impl AudioRenderer for SpeakerRenderer {
    async fn render(&self, audio: DecodedAudio) -> Result<()> {
        self.halted.store(false, Ordering::Release);

        let samples = if audio.sample_rate == PLAYBACK_SAMPLE_RATE {
            audio.samples
        } else {
            resample(&audio.samples, audio.sample_rate, PLAYBACK_SAMPLE_RATE)?
        };

        let config = self.config.clone();
        let halted = Arc::clone(&self.halted);
        // cpal streams aren't Send; run the whole render on a blocking thread.
        tokio::task::spawn_blocking(move || {
            let renderer = Self { config, halted };
            renderer.play_samples_blocking(samples)
        })
        .await
        .map_err(|e| Error::Audio(format!("render task failed: {e}")))?
    }

    fn halt(&self) {
        self.halted.store(true, Ordering::Release);
    }
}

/// Resample mono audio between rates using rubato
#[allow(clippy::cast_possible_truncation)]
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{FftFixedIn, Resampler};

    let chunk_size = 1024;
    let sub_chunks = 2;

    let mut resampler =
        FftFixedIn::<f64>::new(from_rate as usize, to_rate as usize, chunk_size, sub_chunks, 1)
            .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;

    let mut input: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();
    // Pad the tail so the final partial chunk is not dropped.
    let remainder = input.len() % chunk_size;
    if remainder != 0 {
        input.resize(input.len() + (chunk_size - remainder), 0.0);
    }

    let mut output = Vec::new();
    for chunk in input.chunks(chunk_size) {
        let result = resampler
            .process(&[chunk.to_vec()], None)
            .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;
        output.extend_from_slice(&result[0]);
    }

    Ok(output.iter().map(|&s| s as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_changes_length_proportionally() {
        let samples = vec![0.5f32; 48000];
        let out = resample(&samples, 48000, 24000).unwrap();
        // Halving the rate roughly halves the sample count (FFT chunking
        // introduces small edge effects).
        let expected = samples.len() / 2;
        assert!(out.len().abs_diff(expected) < 2048, "got {}", out.len());
    }

    #[test]
    fn resample_identity_rate_is_cheap_path_upstream() {
        // render() skips resampling entirely when rates match; this guards
        // the helper against degenerate zero-length input.
        let out = resample(&[], 24000, 16000).unwrap();
        assert!(out.is_empty());
    }
}
