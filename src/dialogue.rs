//! Conversation state machine
//!
//! Greet once, then listen, classify, and route each turn. Synthesis,
//! playback and language-model failures are recovered in place; only
//! sustained capture-device failure ends the loop.

use std::time::Duration;

use crate::llm::ChatService;
use crate::voice::listen::{Listener, RecognitionOutcome};
use crate::voice::speak::Speaker;

/// Substrings that end the conversation, matched case-insensitively
pub const STOP_PHRASES: [&str; 4] = ["stop", "goodbye", "bye", "thank you"];

/// Opening line spoken before the first listen
const GREETING_LINE: &str = "What is it you want, mortal?";

/// Closing line spoken on a stop phrase
const CLOSING_LINE: &str = "Until next time, mortal...";

/// In-character line spoken when the language model call fails
const LLM_ERROR_LINE: &str = "What are you rambling on about, mortal?";

/// Filler spoken when the model reply extracts to nothing
const EMPTY_REPLY_FILLER: &str = "...";

/// Phase of the conversation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Speaking the opening line
    Greeting,
    /// Waiting for an utterance
    Listening,
    /// Handling a recognized command
    Routing,
    /// Speaking the closing line after a stop phrase
    Stopping,
    /// Terminal; the loop has exited
    Stopped,
}

/// Per-conversation counters, owned by the dialogue loop only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversationState {
    /// Completed listen-route-speak cycles
    pub turn_count: u64,
    /// Consecutive device failures; reset on any non-failure outcome
    pub consecutive_device_failures: u32,
}

/// Tunables for the dialogue loop
#[derive(Debug, Clone)]
pub struct DialogueConfig {
    /// Wait between capture-device retry attempts
    pub device_failure_backoff: Duration,
    /// Consecutive device failures before the loop gives up
    pub max_device_failures: u32,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            device_failure_backoff: Duration::from_secs(3),
            max_device_failures: 6,
        }
    }
}

/// The top-level voice turn-taking loop
pub struct DialogueLoop<L, S, C> {
    listener: L,
    speaker: S,
    chat: C,
    config: DialogueConfig,
    state: ConversationState,
    phase: LoopState,
}

impl<L: Listener, S: Speaker, C: ChatService> DialogueLoop<L, S, C> {
    /// Create a loop with default tunables
    pub fn new(listener: L, speaker: S, chat: C) -> Self {
        Self::with_config(listener, speaker, chat, DialogueConfig::default())
    }

    /// Create a loop with explicit tunables
    pub fn with_config(listener: L, speaker: S, chat: C, config: DialogueConfig) -> Self {
        Self {
            listener,
            speaker,
            chat,
            config,
            state: ConversationState::default(),
            phase: LoopState::Greeting,
        }
    }

    /// Current conversation counters
    #[must_use]
    pub const fn conversation_state(&self) -> &ConversationState {
        &self.state
    }

    /// Current loop phase
    #[must_use]
    pub const fn phase(&self) -> LoopState {
        self.phase
    }

    /// Run the conversation until a stop phrase or unrecoverable device
    /// failure
    pub async fn run(&mut self) {
        // Greeting failure does not block the conversation; the speaker
        // recovers internally
        self.speaker.speak(GREETING_LINE).await;
        self.phase = LoopState::Listening;

        loop {
            match self.listener.listen_once().await {
                RecognitionOutcome::DeviceFailure => {
                    self.state.consecutive_device_failures += 1;
                    if self.state.consecutive_device_failures >= self.config.max_device_failures {
                        tracing::error!(
                            failures = self.state.consecutive_device_failures,
                            "microphone problems persist, giving up"
                        );
                        break;
                    }
                    tracing::warn!(
                        failures = self.state.consecutive_device_failures,
                        backoff_ms = self.config.device_failure_backoff.as_millis() as u64,
                        "capture device failed, retrying after backoff"
                    );
                    tokio::time::sleep(self.config.device_failure_backoff).await;
                }
                RecognitionOutcome::Silence => {
                    self.state.consecutive_device_failures = 0;
                    tracing::debug!("no speech detected, listening again");
                }
                RecognitionOutcome::Text(command) => {
                    self.state.consecutive_device_failures = 0;
                    self.state.turn_count += 1;
                    self.phase = LoopState::Routing;

                    if is_stop_command(&command) {
                        tracing::info!(command = %command, "stop phrase received");
                        self.phase = LoopState::Stopping;
                        self.speaker.speak(CLOSING_LINE).await;
                        break;
                    }

                    self.route(&command).await;
                    self.phase = LoopState::Listening;
                }
            }
        }

        self.phase = LoopState::Stopped;
        tracing::info!(turns = self.state.turn_count, "conversation ended");
    }

    /// Send one command to the language model and speak the reply
    async fn route(&mut self, command: &str) {
        tracing::info!(command = %command, "sending to language model");

        match self.chat.send(command).await {
            Ok(response) => {
                let reply = response.extract_text();
                if reply.is_empty() {
                    tracing::warn!("extracted reply is empty, speaking filler");
                    self.speaker.speak(EMPTY_REPLY_FILLER).await;
                } else {
                    self.speaker.speak(&reply).await;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "language model call failed");
                self.speaker.speak(LLM_ERROR_LINE).await;
            }
        }
    }
}

/// Whether a command contains any stop phrase, case-insensitively
#[must_use]
pub fn is_stop_command(command: &str) -> bool {
    let lower = command.to_lowercase();
    STOP_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_phrases_match_as_substrings() {
        assert!(is_stop_command("ok let's stop now"));
        assert!(is_stop_command("GOODBYE ghost"));
        assert!(is_stop_command("thank you very much"));
        assert!(is_stop_command("bye"));
    }

    #[test]
    fn non_stop_commands_pass_through() {
        assert!(!is_stop_command("tell me a story"));
        assert!(!is_stop_command("what are you"));
    }
}
