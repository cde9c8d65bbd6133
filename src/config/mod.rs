//! Configuration management for the door ghost
//!
//! Resolution order everywhere is env > toml > default.

pub mod file;

use std::path::Path;
use std::time::Duration;

use crate::dialogue::DialogueConfig;
use crate::effect::{EchoTap, EffectConfig};

/// Door ghost configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Language model configuration
    pub llm: LlmConfig,

    /// Speech-to-text configuration
    pub stt: SttConfig,

    /// Text-to-speech configuration
    pub tts: TtsConfig,

    /// Ghost effect tuning
    pub effect: EffectConfig,

    /// Dialogue loop tuning
    pub dialogue: DialogueConfig,
}

/// Language model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key from `GENAI_API_KEY`; empty means not configured
    pub api_key: String,

    /// Model identifier for chat generation
    pub model: String,

    /// Generation endpoint override
    pub endpoint: Option<String>,
}

/// Speech-to-text configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// API key from `OPENAI_API_KEY`; empty means not configured
    pub api_key: String,

    /// Transcription model
    pub model: String,

    /// Transcription endpoint override
    pub endpoint: Option<String>,

    /// Per-attempt capture cap
    pub capture_limit: Duration,
}

/// Text-to-speech configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// API key from `OPENAI_API_KEY`; empty means not configured
    pub api_key: String,

    /// Synthesis model
    pub model: String,

    /// Voice identifier override; `None` lets the deep-voice heuristic pick
    pub voice: Option<String>,

    /// Synthesis endpoint override
    pub endpoint: Option<String>,
}

impl Config {
    /// Load configuration from env and the optional TOML overlay
    #[must_use]
    pub fn load(override_path: Option<&Path>) -> Self {
        let fc = file::load_config_file(override_path);

        let llm = LlmConfig {
            api_key: std::env::var("GENAI_API_KEY")
                .ok()
                .or(fc.llm.api_key)
                .unwrap_or_default(),
            model: std::env::var("GHOST_LLM_MODEL")
                .ok()
                .or(fc.llm.model)
                .unwrap_or_else(|| "gemini-2.5-pro".to_string()),
            endpoint: std::env::var("GHOST_LLM_ENDPOINT").ok().or(fc.llm.endpoint),
        };

        let openai_key = std::env::var("OPENAI_API_KEY").ok();

        let stt = SttConfig {
            api_key: openai_key
                .clone()
                .or(fc.stt.api_key)
                .unwrap_or_default(),
            model: std::env::var("GHOST_STT_MODEL")
                .ok()
                .or(fc.stt.model)
                .unwrap_or_else(|| "whisper-1".to_string()),
            endpoint: std::env::var("GHOST_STT_ENDPOINT").ok().or(fc.stt.endpoint),
            capture_limit: Duration::from_secs(fc.stt.capture_limit_secs.unwrap_or(4)),
        };

        let tts = TtsConfig {
            api_key: openai_key.or(fc.tts.api_key).unwrap_or_default(),
            model: std::env::var("GHOST_TTS_MODEL")
                .ok()
                .or(fc.tts.model)
                .unwrap_or_else(|| "tts-1".to_string()),
            voice: std::env::var("GHOST_TTS_VOICE").ok().or(fc.tts.voice),
            endpoint: std::env::var("GHOST_TTS_ENDPOINT").ok().or(fc.tts.endpoint),
        };

        let effect = resolve_effect(&fc.effect);

        let default_dialogue = DialogueConfig::default();
        let dialogue = DialogueConfig {
            device_failure_backoff: fc
                .dialogue
                .device_failure_backoff_secs
                .map_or(default_dialogue.device_failure_backoff, Duration::from_secs),
            max_device_failures: fc
                .dialogue
                .max_device_failures
                .unwrap_or(default_dialogue.max_device_failures),
        };

        Self {
            llm,
            stt,
            tts,
            effect,
            dialogue,
        }
    }
}

/// Overlay the effect file section onto the built-in ghost preset
fn resolve_effect(fc: &file::EffectFileConfig) -> EffectConfig {
    let default = EffectConfig::default();

    EffectConfig {
        pitch_semitones: fc.pitch_semitones.unwrap_or(default.pitch_semitones),
        echo_taps: fc.echo_taps.as_ref().map_or(default.echo_taps, |taps| {
            taps.iter()
                .map(|t| EchoTap::new(t.delay_ms, t.gain_db))
                .collect()
        }),
        low_pass_cutoff_hz: fc.low_pass_cutoff_hz.unwrap_or(default.low_pass_cutoff_hz),
        fade_out_ms: fc.fade_out_ms.unwrap_or(default.fade_out_ms),
    }
}
