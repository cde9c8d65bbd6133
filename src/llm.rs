//! Chat session client for the hosted language model
//!
//! One request per turn, no retries; the dialogue loop maps failures to a
//! fixed in-character line. Reply extraction is deliberately defensive about
//! response shape.

use async_trait::async_trait;
use serde_json::Value;

use crate::{Error, Result};

/// Default generation endpoint (Gemini-compatible)
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Sends one utterance to the language model per turn
#[async_trait]
pub trait ChatService {
    /// Send the user's utterance with prior turns as context
    ///
    /// # Errors
    ///
    /// Returns `Llm` error if the request fails
    async fn send(&mut self, text: &str) -> Result<ChatResponse>;
}

#[derive(Debug, Clone, serde::Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, serde::Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn new(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

/// A chat session holding the running turn history
pub struct ChatSession {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    history: Vec<Content>,
}

impl ChatSession {
    /// Create a session with the default endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_endpoint(api_key, model, DEFAULT_ENDPOINT.to_string())
    }

    /// Create a session against a custom endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn with_endpoint(api_key: String, model: String, endpoint: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("GENAI_API_KEY not set".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
            history: Vec::new(),
        })
    }

    /// Seed the session with a persona instruction as the opening user turn
    pub fn prime(&mut self, instruction: &str) {
        self.history.insert(0, Content::new("user", instruction));
    }

    /// Best-effort warmup request; failure is logged and ignored
    pub async fn warmup(&mut self) {
        if let Err(e) = self.send("...").await {
            tracing::debug!(error = %e, "warmup request failed (ignored)");
        }
    }

    /// Number of turns currently held in the session
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[async_trait]
impl ChatService for ChatSession {
    async fn send(&mut self, text: &str) -> Result<ChatResponse> {
        self.history.push(Content::new("user", text));

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        );
        let body = serde_json::json!({ "contents": self.history });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "language model API error");
            return Err(Error::Llm(format!("API error {status}: {body}")));
        }

        let raw: Value = response.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        let reply = ChatResponse::new(raw);

        // Keep the model's turn in history so later turns see it
        let reply_text = reply.extract_text();
        if !reply_text.is_empty() {
            self.history.push(Content::new("model", &reply_text));
        }

        Ok(reply)
    }
}

/// A raw language-model response with shape-tolerant text extraction
#[derive(Debug, Clone)]
pub struct ChatResponse {
    raw: Value,
}

impl ChatResponse {
    /// Wrap a raw response value
    #[must_use]
    pub const fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// Extract the reply text, trying strategies in a fixed order
    ///
    /// Order: a direct `text` field; candidate content parts joined by
    /// whitespace; a generic string rendering of the response; an empty
    /// string. A turn never fails just because the response shape was
    /// unexpected.
    #[must_use]
    pub fn extract_text(&self) -> String {
        if let Some(text) = self.raw.get("text").and_then(Value::as_str) {
            if !text.is_empty() {
                return text.to_string();
            }
        }

        if let Some(candidates) = self.raw.get("candidates").and_then(Value::as_array) {
            let mut pieces = Vec::new();
            for candidate in candidates {
                match candidate.get("content") {
                    Some(Value::String(s)) if !s.is_empty() => pieces.push(s.clone()),
                    Some(content) => {
                        if let Some(parts) = content.get("parts").and_then(Value::as_array) {
                            for part in parts {
                                if let Some(text) = part.get("text").and_then(Value::as_str) {
                                    if !text.is_empty() {
                                        pieces.push(text.to_string());
                                    }
                                }
                            }
                        }
                    }
                    None => {}
                }
            }
            if !pieces.is_empty() {
                return pieces.join(" ");
            }
        }

        match &self.raw {
            Value::Null => String::new(),
            Value::Object(map) if map.is_empty() => String::new(),
            other => {
                let rendered = other.to_string();
                if rendered.trim().is_empty() {
                    String::new()
                } else {
                    rendered
                }
            }
        }
    }
}
