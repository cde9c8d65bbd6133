//! Text-to-speech synthesis with per-call backend sessions
//!
//! The TTS backend is known to degrade across repeated uses inside one
//! process, so no session is ever reused: a factory constructs a fresh
//! session for every synthesis call and drops it when the call ends.

use std::path::Path;

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::audio::{decode_artifact, AudioBuffer};
use crate::{Error, Result};

/// Default speech endpoint (OpenAI-speech-compatible)
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/speech";

/// Default synthesis model
const DEFAULT_MODEL: &str = "tts-1";

/// Speaking speed for the ghost voice (1.0 is the backend's normal pace)
const GHOST_SPEED: f64 = 0.8;

/// Output volume applied to the decoded clip
const GHOST_VOLUME: f32 = 0.9;

/// One voice offered by the synthesis backend
#[derive(Debug, Clone)]
pub struct VoiceInfo {
    /// Backend voice identifier
    pub id: String,
    /// Human-readable voice name
    pub name: String,
}

/// Picks the best matching voice from an enumerated list
///
/// First match wins, in enumeration order; the selection is a substring check
/// against the preference list on both the voice name and id.
pub struct VoiceSelector {
    preferences: Vec<String>,
}

impl VoiceSelector {
    /// Create a selector from preference substrings
    #[must_use]
    pub fn new(preferences: Vec<String>) -> Self {
        Self {
            preferences: preferences.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Selector biased toward a deep or male voice
    #[must_use]
    pub fn deep_voice() -> Self {
        Self::new(
            ["male", "baritone", "david", "alex", "onyx"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }

    /// Pick the first voice matching any preference, in enumeration order
    #[must_use]
    pub fn select<'a>(&self, voices: &'a [VoiceInfo]) -> Option<&'a VoiceInfo> {
        voices.iter().find(|v| {
            let name = v.name.to_lowercase();
            let id = v.id.to_lowercase();
            self.preferences
                .iter()
                .any(|p| name.contains(p) || id.contains(p))
        })
    }
}

/// A synthesized utterance: the temp artifact plus its decoded clip
///
/// The artifact file is removed when the value is dropped, on every exit
/// path.
pub struct SpeechArtifact {
    file: NamedTempFile,
    buffer: AudioBuffer,
}

impl SpeechArtifact {
    /// Wrap a temp artifact and its decoded buffer
    #[must_use]
    pub fn new(file: NamedTempFile, buffer: AudioBuffer) -> Self {
        Self { file, buffer }
    }

    /// The decoded clip
    #[must_use]
    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    /// Path of the temp artifact on disk
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Turns text into audio artifacts
#[async_trait(?Send)]
pub trait Synthesizer {
    /// Synthesize with the configured ghost voice settings
    async fn synthesize(&self, text: &str) -> Result<SpeechArtifact>;

    /// Synthesize with default backend settings (fallback voice)
    async fn synthesize_plain(&self, text: &str) -> Result<SpeechArtifact>;
}

/// Builds one fresh [`TtsSession`] per synthesis call
pub struct TtsSessionFactory {
    endpoint: String,
    api_key: String,
    model: String,
    voice: String,
    default_voice: String,
}

impl TtsSessionFactory {
    /// Create a factory, resolving the voice through a selector
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, voice_override: Option<String>) -> Result<Self> {
        Self::with_endpoint(api_key, voice_override, DEFAULT_ENDPOINT.to_string())
    }

    /// Create a factory with a custom endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn with_endpoint(
        api_key: String,
        voice_override: Option<String>,
        endpoint: String,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("API key required for TTS".to_string()));
        }

        let voices = backend_voices();
        let default_voice = voices[0].id.clone();
        let voice = voice_override.unwrap_or_else(|| {
            VoiceSelector::deep_voice()
                .select(&voices)
                .map_or_else(|| default_voice.clone(), |v| v.id.clone())
        });

        tracing::debug!(voice, "TTS session factory initialized");

        Ok(Self {
            endpoint,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            voice,
            default_voice,
        })
    }

    /// Override the synthesis model
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Construct a fresh session with the ghost voice settings
    fn create(&self) -> TtsSession {
        TtsSession {
            client: reqwest::Client::new(),
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            voice: self.voice.clone(),
            speed: GHOST_SPEED,
            volume: GHOST_VOLUME,
        }
    }

    /// Construct a fresh session with default backend settings
    fn create_plain(&self) -> TtsSession {
        TtsSession {
            client: reqwest::Client::new(),
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            voice: self.default_voice.clone(),
            speed: 1.0,
            volume: 1.0,
        }
    }
}

#[async_trait(?Send)]
impl Synthesizer for TtsSessionFactory {
    async fn synthesize(&self, text: &str) -> Result<SpeechArtifact> {
        // Session is dropped when this call returns, success or not
        let session = self.create();
        session.synthesize(text).await
    }

    async fn synthesize_plain(&self, text: &str) -> Result<SpeechArtifact> {
        let session = self.create_plain();
        session.synthesize(text).await
    }
}

/// One synthesis backend session; never reused across calls
pub struct TtsSession {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    voice: String,
    speed: f64,
    volume: f32,
}

#[derive(serde::Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f64,
    response_format: &'a str,
}

impl TtsSession {
    /// Synthesize text into a temp artifact and decode it
    ///
    /// # Errors
    ///
    /// Returns `Synthesis` error if the backend produces no output or a
    /// zero-length artifact
    pub async fn synthesize(&self, text: &str) -> Result<SpeechArtifact> {
        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
            response_format: "wav",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("TTS error {status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        let file = NamedTempFile::new()?;
        std::fs::write(file.path(), &audio)?;

        // A missing or empty artifact means the backend silently failed
        let written = std::fs::metadata(file.path()).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(Error::Synthesis(format!(
                "backend produced no audio at {}",
                file.path().display()
            )));
        }

        tracing::debug!(
            path = %file.path().display(),
            bytes = written,
            voice = %self.voice,
            "synthesized speech artifact"
        );

        let buffer = decode_artifact(file.path())
            .map_err(|e| Error::Synthesis(format!("artifact decode failed: {e}")))?;
        if buffer.is_empty() {
            return Err(Error::Synthesis("decoded artifact is empty".to_string()));
        }

        let buffer = apply_volume(&buffer, self.volume)?;
        Ok(SpeechArtifact::new(file, buffer))
    }
}

/// Scale a clip by the session volume
fn apply_volume(buffer: &AudioBuffer, volume: f32) -> Result<AudioBuffer> {
    if (volume - 1.0).abs() < f32::EPSILON {
        return Ok(buffer.clone());
    }
    let samples = buffer
        .samples()
        .iter()
        .map(|&s| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (f32::from(s) * volume).round().clamp(-32768.0, 32767.0) as i16;
            v
        })
        .collect();
    AudioBuffer::new(samples, buffer.sample_rate(), buffer.channels())
}

/// Fixed voice catalog of the speech backend
fn backend_voices() -> Vec<VoiceInfo> {
    [
        ("alloy", "Alloy"),
        ("echo", "Echo"),
        ("fable", "Fable"),
        ("onyx", "Onyx"),
        ("nova", "Nova"),
        ("shimmer", "Shimmer"),
    ]
    .into_iter()
    .map(|(id, name)| VoiceInfo {
        id: id.to_string(),
        name: name.to_string(),
    })
    .collect()
}
