//! TOML configuration file loading
//!
//! Supports `~/.config/doorghost/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct GhostConfigFile {
    /// Language model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech-to-text configuration
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Text-to-speech configuration
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// Ghost effect tuning
    #[serde(default)]
    pub effect: EffectFileConfig,

    /// Dialogue loop tuning
    #[serde(default)]
    pub dialogue: DialogueFileConfig,
}

/// Language model configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// API key (env `GENAI_API_KEY` takes precedence)
    pub api_key: Option<String>,

    /// Model identifier (e.g. "gemini-2.5-pro")
    pub model: Option<String>,

    /// Generation endpoint override
    pub endpoint: Option<String>,
}

/// Speech-to-text configuration
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    /// API key (env `OPENAI_API_KEY` takes precedence)
    pub api_key: Option<String>,

    /// Transcription model (e.g. "whisper-1")
    pub model: Option<String>,

    /// Transcription endpoint override
    pub endpoint: Option<String>,

    /// Per-attempt capture cap in seconds
    pub capture_limit_secs: Option<u64>,
}

/// Text-to-speech configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    /// API key (env `OPENAI_API_KEY` takes precedence)
    pub api_key: Option<String>,

    /// Synthesis model (e.g. "tts-1")
    pub model: Option<String>,

    /// Voice identifier override; skips the deep-voice heuristic
    pub voice: Option<String>,

    /// Synthesis endpoint override
    pub endpoint: Option<String>,
}

/// Ghost effect tuning
#[derive(Debug, Default, Deserialize)]
pub struct EffectFileConfig {
    /// Pitch shift in semitones (negative = deeper)
    pub pitch_semitones: Option<f32>,

    /// Echo taps applied over the pitched base
    pub echo_taps: Option<Vec<EchoTapFileConfig>>,

    /// Low-pass cutoff frequency in Hz
    pub low_pass_cutoff_hz: Option<u32>,

    /// Trailing fade-out length in milliseconds
    pub fade_out_ms: Option<u32>,
}

/// One echo tap entry (`[[effect.echo_taps]]`)
#[derive(Debug, Deserialize)]
pub struct EchoTapFileConfig {
    pub delay_ms: u32,
    pub gain_db: f32,
}

/// Dialogue loop tuning
#[derive(Debug, Default, Deserialize)]
pub struct DialogueFileConfig {
    /// Wait between capture-device retries, in seconds
    pub device_failure_backoff_secs: Option<u64>,

    /// Consecutive device failures before giving up
    pub max_device_failures: Option<u32>,
}

/// Load the TOML config file from an explicit path or the standard location
///
/// Returns `GhostConfigFile::default()` if the file doesn't exist or can't be
/// parsed.
pub fn load_config_file(override_path: Option<&Path>) -> GhostConfigFile {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => {
            let Some(p) = config_file_path() else {
                return GhostConfigFile::default();
            };
            p
        }
    };

    if !path.exists() {
        return GhostConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                GhostConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            GhostConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/doorghost/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("doorghost").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_leaves_other_sections_default() {
        let fc: GhostConfigFile = toml::from_str(
            r#"
            [llm]
            model = "gemini-2.5-flash"
            "#,
        )
        .unwrap();

        assert_eq!(fc.llm.model.as_deref(), Some("gemini-2.5-flash"));
        assert!(fc.llm.api_key.is_none());
        assert!(fc.tts.voice.is_none());
        assert!(fc.effect.echo_taps.is_none());
    }

    #[test]
    fn echo_taps_parse_as_array_of_tables() {
        let fc: GhostConfigFile = toml::from_str(
            r#"
            [effect]
            pitch_semitones = -2.0

            [[effect.echo_taps]]
            delay_ms = 180
            gain_db = -8.0

            [[effect.echo_taps]]
            delay_ms = 420
            gain_db = -12.0
            "#,
        )
        .unwrap();

        let taps = fc.effect.echo_taps.unwrap();
        assert_eq!(taps.len(), 2);
        assert_eq!(taps[0].delay_ms, 180);
        assert!((taps[1].gain_db - -12.0).abs() < f32::EPSILON);
    }
}
