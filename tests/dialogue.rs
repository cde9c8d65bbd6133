//! Dialogue loop integration tests
//!
//! Drives the state machine with scripted listeners, a recording speaker and
//! a scripted chat backend; no audio hardware or network involved.

use std::collections::VecDeque;
use std::rc::Rc;
use std::cell::RefCell;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use doorghost::llm::{ChatResponse, ChatService};
use doorghost::voice::{Listener, RecognitionOutcome, Speaker};
use doorghost::{DialogueConfig, DialogueLoop, Error, LoopState, Result};

/// Replays a fixed sequence of recognition outcomes
struct ScriptedListener {
    outcomes: VecDeque<RecognitionOutcome>,
}

impl ScriptedListener {
    fn new(outcomes: impl IntoIterator<Item = RecognitionOutcome>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
        }
    }
}

#[async_trait(?Send)]
impl Listener for ScriptedListener {
    async fn listen_once(&mut self) -> RecognitionOutcome {
        self.outcomes
            .pop_front()
            .expect("listener called after script was exhausted")
    }
}

/// Records every line the loop tries to speak
#[derive(Clone)]
struct RecordingSpeaker {
    spoken: Rc<RefCell<Vec<String>>>,
}

impl RecordingSpeaker {
    fn new() -> Self {
        Self {
            spoken: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn lines(&self) -> Vec<String> {
        self.spoken.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Speaker for RecordingSpeaker {
    async fn speak(&mut self, text: &str) {
        self.spoken.borrow_mut().push(text.to_string());
    }
}

/// One scripted model turn
enum ChatTurn {
    Reply(serde_json::Value),
    Fail,
}

/// Replays scripted model turns and records every command it receives
#[derive(Clone)]
struct ScriptedChat {
    turns: Arc<Mutex<VecDeque<ChatTurn>>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ScriptedChat {
    fn new(turns: impl IntoIterator<Item = ChatTurn>) -> Self {
        Self {
            turns: Arc::new(Mutex::new(turns.into_iter().collect())),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatService for ScriptedChat {
    async fn send(&mut self, text: &str) -> Result<ChatResponse> {
        self.sent.lock().unwrap().push(text.to_string());
        match self.turns.lock().unwrap().pop_front() {
            Some(ChatTurn::Reply(value)) => Ok(ChatResponse::new(value)),
            Some(ChatTurn::Fail) => Err(Error::Llm("scripted failure".to_string())),
            None => panic!("chat called after script was exhausted"),
        }
    }
}

/// Tunables that keep tests fast: no real backoff sleeping
fn fast_config() -> DialogueConfig {
    DialogueConfig {
        device_failure_backoff: Duration::ZERO,
        max_device_failures: 6,
    }
}

#[tokio::test]
async fn six_consecutive_device_failures_end_the_conversation() {
    let listener =
        ScriptedListener::new(std::iter::repeat(RecognitionOutcome::DeviceFailure).take(6));
    let speaker = RecordingSpeaker::new();
    let chat = ScriptedChat::new([]);

    let mut dialogue =
        DialogueLoop::with_config(listener, speaker.clone(), chat.clone(), fast_config());
    dialogue.run().await;

    assert_eq!(dialogue.phase(), LoopState::Stopped);
    assert_eq!(dialogue.conversation_state().consecutive_device_failures, 6);
    assert_eq!(dialogue.conversation_state().turn_count, 0);

    // Only the greeting was spoken; no closing line on device failure
    assert_eq!(speaker.lines().len(), 1);
    assert!(chat.sent().is_empty());
}

#[tokio::test]
async fn silence_resets_the_device_failure_counter() {
    let listener = ScriptedListener::new([
        RecognitionOutcome::DeviceFailure,
        RecognitionOutcome::DeviceFailure,
        RecognitionOutcome::DeviceFailure,
        RecognitionOutcome::DeviceFailure,
        RecognitionOutcome::DeviceFailure,
        RecognitionOutcome::Silence,
        RecognitionOutcome::DeviceFailure,
        RecognitionOutcome::Text("goodbye".to_string()),
    ]);
    let speaker = RecordingSpeaker::new();
    let chat = ScriptedChat::new([]);

    let mut dialogue =
        DialogueLoop::with_config(listener, speaker.clone(), chat.clone(), fast_config());
    dialogue.run().await;

    // The reset after silence means the streak never reached six
    assert_eq!(dialogue.phase(), LoopState::Stopped);
    assert_eq!(dialogue.conversation_state().turn_count, 1);
    assert!(chat.sent().is_empty());
}

#[tokio::test]
async fn stop_phrase_speaks_the_closing_line_without_the_model() {
    let listener = ScriptedListener::new([RecognitionOutcome::Text(
        "ok let's stop now".to_string(),
    )]);
    let speaker = RecordingSpeaker::new();
    let chat = ScriptedChat::new([]);

    let mut dialogue =
        DialogueLoop::with_config(listener, speaker.clone(), chat.clone(), fast_config());
    dialogue.run().await;

    // Greeting plus closing line, and the model was never consulted
    assert_eq!(speaker.lines().len(), 2);
    assert!(chat.sent().is_empty());
    assert_eq!(dialogue.conversation_state().turn_count, 1);
}

#[tokio::test]
async fn recognized_text_is_routed_and_the_reply_spoken() {
    let listener = ScriptedListener::new([
        RecognitionOutcome::Text("who are you".to_string()),
        RecognitionOutcome::Text("bye".to_string()),
    ]);
    let speaker = RecordingSpeaker::new();
    let chat = ScriptedChat::new([ChatTurn::Reply(json!({"text": "Boo."}))]);

    let mut dialogue =
        DialogueLoop::with_config(listener, speaker.clone(), chat.clone(), fast_config());
    dialogue.run().await;

    assert_eq!(chat.sent(), vec!["who are you".to_string()]);
    assert!(speaker.lines().contains(&"Boo.".to_string()));
    assert_eq!(dialogue.conversation_state().turn_count, 2);
}

#[tokio::test]
async fn empty_reply_speaks_the_filler() {
    let listener = ScriptedListener::new([
        RecognitionOutcome::Text("say nothing".to_string()),
        RecognitionOutcome::Text("goodbye".to_string()),
    ]);
    let speaker = RecordingSpeaker::new();
    let chat = ScriptedChat::new([ChatTurn::Reply(json!({}))]);

    let mut dialogue =
        DialogueLoop::with_config(listener, speaker.clone(), chat.clone(), fast_config());
    dialogue.run().await;

    assert!(speaker.lines().contains(&"...".to_string()));
}

#[tokio::test]
async fn model_failure_is_answered_in_character_and_the_loop_survives() {
    let listener = ScriptedListener::new([
        RecognitionOutcome::Text("trigger a failure".to_string()),
        RecognitionOutcome::Text("tell me more".to_string()),
        RecognitionOutcome::Text("thank you".to_string()),
    ]);
    let speaker = RecordingSpeaker::new();
    let chat = ScriptedChat::new([
        ChatTurn::Fail,
        ChatTurn::Reply(json!({"text": "The walls remember you."})),
    ]);

    let mut dialogue =
        DialogueLoop::with_config(listener, speaker.clone(), chat.clone(), fast_config());
    dialogue.run().await;

    // A failed turn speaks a fixed line, then the next turn works normally
    assert_eq!(chat.sent().len(), 2);
    assert!(speaker
        .lines()
        .contains(&"The walls remember you.".to_string()));
    assert_eq!(dialogue.phase(), LoopState::Stopped);
    assert_eq!(dialogue.conversation_state().turn_count, 3);
}

#[tokio::test]
async fn silence_never_reaches_the_model() {
    let listener = ScriptedListener::new([
        RecognitionOutcome::Silence,
        RecognitionOutcome::Silence,
        RecognitionOutcome::Text("thank you".to_string()),
    ]);
    let speaker = RecordingSpeaker::new();
    let chat = ScriptedChat::new([]);

    let mut dialogue =
        DialogueLoop::with_config(listener, speaker.clone(), chat.clone(), fast_config());
    dialogue.run().await;

    assert!(chat.sent().is_empty());
    assert_eq!(dialogue.conversation_state().consecutive_device_failures, 0);
}
