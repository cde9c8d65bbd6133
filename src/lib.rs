//! Door ghost - a haunted voice agent for the front porch
//!
//! This library provides the pieces of the conversation loop:
//! - Microphone capture and transcription (listen adapter)
//! - Per-call TTS sessions and the ghost effect pipeline
//! - Playback through the default output device
//! - The dialogue state machine tying it all together
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Dialogue Loop                  │
//! │   greet  │  listen  │  route  │  speak      │
//! └───────┬─────────────────────────┬───────────┘
//!         │                         │
//! ┌───────▼────────┐       ┌────────▼───────────┐
//! │ Listen Adapter │       │ Speak Orchestrator │
//! │  capture + STT │       │ TTS → effect → out │
//! └────────────────┘       └────────────────────┘
//! ```

pub mod audio;
pub mod config;
pub mod dialogue;
pub mod effect;
pub mod error;
pub mod llm;
pub mod voice;

pub use audio::{AudioBuffer, OUTPUT_SAMPLE_RATE};
pub use config::Config;
pub use dialogue::{ConversationState, DialogueConfig, DialogueLoop, LoopState};
pub use effect::{apply_ghost_effect, EchoTap, EffectConfig};
pub use error::{Error, Result};
pub use llm::{ChatResponse, ChatService, ChatSession};
pub use voice::{
    AudioCapture, AudioPlayback, ListenAdapter, Listener, PlaybackSink, RecognitionOutcome,
    SpeakOrchestrator, Speaker, SpeechArtifact, SpeechToText, Synthesizer, TtsSessionFactory,
};
