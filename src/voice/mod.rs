//! Voice processing module
//!
//! Microphone capture and transcription, per-call TTS sessions, the speak
//! orchestrator, and playback.

pub mod capture;
pub mod listen;
pub mod playback;
pub mod speak;
pub mod stt;
pub mod tts;

pub use capture::{AudioCapture, CAPTURE_SAMPLE_RATE};
pub use listen::{ListenAdapter, Listener, RecognitionOutcome};
pub use playback::{AudioPlayback, PlaybackSink};
pub use speak::{SpeakOrchestrator, Speaker};
pub use stt::SpeechToText;
pub use tts::{SpeechArtifact, Synthesizer, TtsSessionFactory, VoiceInfo, VoiceSelector};
