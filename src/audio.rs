//! Audio buffer value type and codec helpers

use std::io::Cursor;
use std::path::Path;

use crate::{Error, Result};

/// Fixed output sample rate of the effect pipeline (Hz)
pub const OUTPUT_SAMPLE_RATE: u32 = 44_100;

/// A decoded audio clip
///
/// Samples are signed 16-bit amplitudes, interleaved when stereo. Buffers are
/// never mutated across pipeline stages; each stage returns a new buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Create a buffer, validating the format invariants
    ///
    /// # Errors
    ///
    /// Returns `InvalidAudioFormat` if the sample rate is zero, the channel
    /// count is not 1 or 2, or the sample count is not aligned to the channel
    /// count.
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::InvalidAudioFormat(
                "sample rate must be positive".to_string(),
            ));
        }
        if channels != 1 && channels != 2 {
            return Err(Error::InvalidAudioFormat(format!(
                "unsupported channel count: {channels}"
            )));
        }
        if samples.len() % channels as usize != 0 {
            return Err(Error::InvalidAudioFormat(format!(
                "{} samples not aligned to {channels} channels",
                samples.len()
            )));
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// The interleaved samples
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count (1 or 2)
    #[must_use]
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (samples per channel)
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Clip duration in milliseconds
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.frames() as u64 * 1000 / u64::from(self.sample_rate)
    }

    /// Whether the buffer holds no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Decode an audio artifact file (WAV or MP3) into a buffer
///
/// Sniffs the RIFF header to pick the decoder.
///
/// # Errors
///
/// Returns error if the file cannot be read or decoded
pub fn decode_artifact(path: &Path) -> Result<AudioBuffer> {
    let bytes = std::fs::read(path)?;
    if bytes.starts_with(b"RIFF") {
        decode_wav(&bytes)
    } else {
        decode_mp3(&bytes)
    }
}

/// Decode WAV bytes into a buffer
///
/// # Errors
///
/// Returns error if the WAV data is malformed or uses an unsupported layout
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| Error::InvalidAudioFormat(e.to_string()))?;
    let spec = reader.spec();

    let samples: Vec<i16> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::InvalidAudioFormat(e.to_string()))?,
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| {
                s.map(|v| {
                    #[allow(clippy::cast_possible_truncation)]
                    let v = (v * 32767.0).clamp(-32768.0, 32767.0) as i16;
                    v
                })
            })
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::InvalidAudioFormat(e.to_string()))?,
    };

    AudioBuffer::new(samples, spec.sample_rate, spec.channels)
}

/// Decode MP3 bytes into a buffer
///
/// # Errors
///
/// Returns error if the MP3 data is malformed or empty
pub fn decode_mp3(bytes: &[u8]) -> Result<AudioBuffer> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;
    let mut channels = 0u16;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    #[allow(clippy::cast_sign_loss)]
                    {
                        sample_rate = frame.sample_rate as u32;
                    }
                    #[allow(clippy::cast_possible_truncation)]
                    {
                        channels = frame.channels as u16;
                    }
                }
                samples.extend_from_slice(&frame.data);
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::InvalidAudioFormat(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() {
        return Err(Error::InvalidAudioFormat(
            "MP3 stream contained no frames".to_string(),
        ));
    }

    AudioBuffer::new(samples, sample_rate, channels)
}

/// Convert captured f32 samples to mono WAV bytes for STT APIs
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

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::Stt(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Stt(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Stt(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
