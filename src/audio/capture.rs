//! Microphone capture for voice turns
//!
//! Records mono 16 kHz audio from the default input device and encodes it to
//! WAV for the speech-recognition service.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Capture sample rate (16 kHz is what speech models expect)
pub const CAPTURE_SAMPLE_RATE: u32 = 16000;

/// Records audio from the default input device
pub struct MicCapture {
    device: Device,
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl MicCapture {
    /// Open the default input device
    ///
    /// # Errors
    ///
    /// Returns error if no input device or suitable config is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(CAPTURE_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(CAPTURE_SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable input config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(CAPTURE_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = CAPTURE_SAMPLE_RATE,
            "microphone capture initialized"
        );

        Ok(Self {
            device,
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Start recording into the internal buffer
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        let buffer = Arc::clone(&self.buffer);

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    buffer.lock().expect("capture buffer lock").extend_from_slice(data);
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("recording started");
        Ok(())
    }

    /// Stop recording and return everything captured since `start`
    pub fn stop(&mut self) -> Vec<f32> {
        self.stream = None;
        let samples = std::mem::take(&mut *self.buffer.lock().expect("capture buffer lock"));
        tracing::debug!(samples = samples.len(), "recording stopped");
        samples
    }

    /// Copy of the buffer without consuming it (level metering)
    #[must_use]
    pub fn peek_buffer(&self) -> Vec<f32> {
        self.buffer.lock().expect("capture buffer lock").clone()
    }

    /// Discard buffered samples
    pub fn clear_buffer(&self) {
        self.buffer.lock().expect("capture buffer lock").clear();
    }

    /// Configured sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        CAPTURE_SAMPLE_RATE
    }
}

/// Encode f32 samples as 16-bit mono WAV bytes
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::Audio(format!("WAV writer: {e}")))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            writer
                .write_sample(value)
                .map_err(|e| Error::Audio(format!("WAV write: {e}")))?;
        }

        writer
            .finalize()
            .map_err(|e| Error::Audio(format!("WAV finalize: {e}")))?;
    }

    Ok(cursor.into_inner())
}
