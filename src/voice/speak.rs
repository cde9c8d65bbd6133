//! Speak orchestrator: synthesize, apply the ghost effect, play
//!
//! If any stage fails, one plain-voice fallback keeps the agent from going
//! silent. A failed fallback is logged; `speak` never propagates an error to
//! the dialogue loop.

use async_trait::async_trait;

use crate::effect::{apply_ghost_effect, EffectConfig};
use crate::voice::playback::PlaybackSink;
use crate::voice::tts::Synthesizer;
use crate::Result;

/// Speaks a line of text out loud
#[async_trait(?Send)]
pub trait Speaker {
    /// Speak the text; failures are recovered internally
    async fn speak(&mut self, text: &str);
}

/// Composes synthesis, the effect pipeline and playback
pub struct SpeakOrchestrator<S, P> {
    synth: S,
    playback: P,
    effect: EffectConfig,
}

impl<S: Synthesizer, P: PlaybackSink> SpeakOrchestrator<S, P> {
    /// Create an orchestrator
    pub fn new(synth: S, playback: P, effect: EffectConfig) -> Self {
        Self {
            synth,
            playback,
            effect,
        }
    }

    async fn speak_effected(&mut self, text: &str) -> Result<()> {
        // The artifact is dropped on every path out of this function, which
        // removes the temp file
        let artifact = self.synth.synthesize(text).await?;
        let ghost = apply_ghost_effect(artifact.buffer(), &self.effect)?;

        tracing::debug!(
            duration_ms = ghost.duration_ms(),
            channels = ghost.channels(),
            sample_rate = ghost.sample_rate(),
            "playing effected speech"
        );
        self.playback.play(&ghost)
    }

    async fn speak_plain(&mut self, text: &str) -> Result<()> {
        let text = if text.trim().is_empty() { "..." } else { text };
        let artifact = self.synth.synthesize_plain(text).await?;
        self.playback.play(artifact.buffer())
    }
}

#[async_trait(?Send)]
impl<S: Synthesizer, P: PlaybackSink> Speaker for SpeakOrchestrator<S, P> {
    async fn speak(&mut self, text: &str) {
        if text.trim().is_empty() {
            tracing::info!("speak called with empty text, nothing to say");
            return;
        }

        tracing::info!(text, "speaking");

        if let Err(e) = self.speak_effected(text).await {
            tracing::warn!(error = %e, "effected speech failed, falling back to plain voice");
            if let Err(e2) = self.speak_plain(text).await {
                tracing::error!(error = %e2, "fallback speech also failed");
            }
        }
    }
}
