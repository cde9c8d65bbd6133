//! Listen adapter: capture one utterance and transcribe it
//!
//! Classifies every attempt as device failure, silence, or recognized text so
//! the dialogue loop can react without unwinding.

use std::time::Duration;

use async_trait::async_trait;

use crate::audio::samples_to_wav;
use crate::voice::capture::{rms, AudioCapture, CAPTURE_SAMPLE_RATE};
use crate::Result;

/// Hard cap on capture length per attempt
const DEFAULT_CAPTURE: Duration = Duration::from_secs(4);

/// Ambient noise calibration window
const CALIBRATE: Duration = Duration::from_millis(400);

/// Trailing pause that ends an utterance early
const PAUSE: Duration = Duration::from_millis(500);

/// Poll interval while recording
const POLL: Duration = Duration::from_millis(100);

/// Floor for the speech energy threshold; calibration can only raise it
const MIN_ENERGY_THRESHOLD: f32 = 0.015;

/// Minimum utterance length worth transcribing (300 ms)
const MIN_SPEECH_SAMPLES: usize = CAPTURE_SAMPLE_RATE as usize * 3 / 10;

/// Outcome of one listen attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    /// Capture device or permission problem
    DeviceFailure,
    /// Nothing recognizable was heard
    Silence,
    /// A recognized utterance
    Text(String),
}

/// Captures a single utterance per call
#[async_trait(?Send)]
pub trait Listener {
    /// Capture and transcribe one utterance
    async fn listen_once(&mut self) -> RecognitionOutcome;
}

/// Microphone listen adapter backed by an HTTP transcription service
pub struct ListenAdapter {
    stt: crate::voice::stt::SpeechToText,
    capture_limit: Duration,
}

impl ListenAdapter {
    /// Create an adapter with the default capture cap
    #[must_use]
    pub fn new(stt: crate::voice::stt::SpeechToText) -> Self {
        Self {
            stt,
            capture_limit: DEFAULT_CAPTURE,
        }
    }

    /// Override the per-attempt capture cap
    #[must_use]
    pub const fn with_capture_limit(mut self, limit: Duration) -> Self {
        self.capture_limit = limit;
        self
    }

    /// Record one utterance from the microphone
    ///
    /// Opens the device fresh for each attempt and recalibrates the silence
    /// threshold against ambient noise before recording; nothing is cached
    /// across failures.
    async fn capture_utterance(&self) -> Result<Vec<f32>> {
        let mut capture = AudioCapture::new()?;
        capture.start()?;

        tokio::time::sleep(CALIBRATE).await;
        let ambient = capture.take_buffer();
        let threshold = (rms(&ambient) * 1.5).max(MIN_ENERGY_THRESHOLD);
        tracing::debug!(threshold, "ambient calibration complete, listening");

        let mut samples = Vec::new();
        let mut heard_speech = false;
        let mut trailing_pause = Duration::ZERO;
        let deadline = tokio::time::Instant::now() + self.capture_limit;

        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep(POLL).await;
            let chunk = capture.take_buffer();
            let speaking = rms(&chunk) > threshold;

            if speaking {
                heard_speech = true;
                trailing_pause = Duration::ZERO;
            } else if heard_speech {
                trailing_pause += POLL;
            }

            // Leading pre-speech audio is dropped; only keep from first speech
            if heard_speech {
                samples.extend(chunk);
            }

            if heard_speech && trailing_pause >= PAUSE {
                break;
            }
        }

        capture.stop();
        tracing::debug!(samples = samples.len(), "recording captured");
        Ok(samples)
    }
}

#[async_trait(?Send)]
impl Listener for ListenAdapter {
    async fn listen_once(&mut self) -> RecognitionOutcome {
        let samples = match self.capture_utterance().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "microphone capture failed");
                return RecognitionOutcome::DeviceFailure;
            }
        };

        if samples.len() < MIN_SPEECH_SAMPLES {
            tracing::debug!("no speech detected this round");
            return RecognitionOutcome::Silence;
        }

        let wav = match samples_to_wav(&samples, CAPTURE_SAMPLE_RATE) {
            Ok(w) => w,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode capture, treating as silence");
                return RecognitionOutcome::Silence;
            }
        };

        // Any transcription backend error degrades to silence rather than
        // propagating
        match self.stt.transcribe(&wav).await {
            Ok(text) if !text.trim().is_empty() => {
                tracing::info!(text = %text, "utterance recognized");
                RecognitionOutcome::Text(text)
            }
            Ok(_) => {
                tracing::debug!("speech not understood");
                RecognitionOutcome::Silence
            }
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed, treating as silence");
                RecognitionOutcome::Silence
            }
        }
    }
}
