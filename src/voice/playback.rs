//! Audio playback to speakers

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleRate;

use crate::audio::AudioBuffer;
use crate::{Error, Result};

/// Plays a clip through an audio output device
pub trait PlaybackSink {
    /// Play a buffer, blocking until playback completes
    ///
    /// # Errors
    ///
    /// Returns `Playback` error if the output device is unavailable
    fn play(&mut self, buffer: &AudioBuffer) -> Result<()>;
}

/// Plays audio through the default output device
///
/// The device is opened per call and released as soon as the clip has
/// drained. Blocking is deliberate: the dialogue loop must not listen while
/// the agent is still speaking.
pub struct AudioPlayback;

impl AudioPlayback {
    /// Create a new playback instance, verifying an output device exists
    ///
    /// # Errors
    ///
    /// Returns `Playback` error if no output device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Playback("no output device available".to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            "audio playback initialized"
        );

        Ok(Self)
    }
}

impl PlaybackSink for AudioPlayback {
    fn play(&mut self, buffer: &AudioBuffer) -> Result<()> {
        play_blocking(buffer)
    }
}

/// Play a buffer through the default output device, blocking until done
#[allow(clippy::significant_drop_tightening)]
fn play_blocking(buffer: &AudioBuffer) -> Result<()> {
    if buffer.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Playback("no output device".to_string()))?;

    let rate = buffer.sample_rate();
    let in_channels = buffer.channels();

    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Playback(e.to_string()))?
        .find(|c| {
            c.channels() == in_channels
                && c.min_sample_rate() <= SampleRate(rate)
                && c.max_sample_rate() >= SampleRate(rate)
        })
        .or_else(|| {
            device.supported_output_configs().ok()?.find(|c| {
                c.min_sample_rate() <= SampleRate(rate) && c.max_sample_rate() >= SampleRate(rate)
            })
        })
        .ok_or_else(|| Error::Playback(format!("no output config supports {rate} Hz")))?;

    let config = supported.with_sample_rate(SampleRate(rate)).config();
    let out_channels = config.channels as usize;
    let in_channels = in_channels as usize;

    let samples: Arc<Vec<f32>> = Arc::new(
        buffer
            .samples()
            .iter()
            .map(|&s| f32::from(s) / 32768.0)
            .collect(),
    );
    let total_frames = buffer.frames();

    let position = Arc::new(Mutex::new(0usize));
    let finished = Arc::new(Mutex::new(false));

    let samples_cb = Arc::clone(&samples);
    let position_cb = Arc::clone(&position);
    let finished_cb = Arc::clone(&finished);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut pos = match position_cb.lock() {
                    Ok(p) => p,
                    Err(_) => return,
                };
                for frame in data.chunks_mut(out_channels) {
                    if *pos < total_frames {
                        let base = *pos * in_channels;
                        for (c, out) in frame.iter_mut().enumerate() {
                            *out = samples_cb[base + c.min(in_channels - 1)];
                        }
                        *pos += 1;
                    } else {
                        if let Ok(mut done) = finished_cb.lock() {
                            *done = true;
                        }
                        for out in frame.iter_mut() {
                            *out = 0.0;
                        }
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Playback(e.to_string()))?;

    stream.play().map_err(|e| Error::Playback(e.to_string()))?;

    // Poll for completion with a timeout slightly past the clip length
    let start = Instant::now();
    let timeout = Duration::from_millis(buffer.duration_ms() + 500);

    loop {
        if finished.lock().map(|done| *done).unwrap_or(true) {
            break;
        }
        if start.elapsed() > timeout {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    // Let the device drain the last frames
    std::thread::sleep(Duration::from_millis(100));

    drop(stream);
    tracing::debug!(
        frames = total_frames,
        duration_ms = buffer.duration_ms(),
        "playback complete"
    );

    Ok(())
}
