//! Streaming text generation client
//!
//! OpenAI-compatible chat-completions client with SSE streaming. Deltas are
//! pushed into a bounded channel; a start failure is reported from
//! `start_stream` itself so callers can fall back to another model, while
//! mid-stream failures arrive as the final channel item.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;

use parla_core::{ChatRole, ChatTurn};

use crate::ProviderError;

/// One streamed item: a text delta or a terminal mid-stream error
pub type TextDelta = Result<String, ProviderError>;

/// A streaming generation request
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub model: String,
    pub system_prompt: String,
    pub history: Vec<ChatTurn>,
}

/// Streaming text generation provider
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Start a streaming generation.
    ///
    /// Returns `Err` only when the stream fails to start; once a receiver is
    /// returned, errors are delivered in-band and the channel closes after
    /// the final delta.
    async fn start_stream(&self, request: TextRequest) -> Result<mpsc::Receiver<TextDelta>, ProviderError>;
}

/// OpenAI-compatible chat completions client
pub struct OpenAiTextProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenAiTextProvider {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

/// Extract content deltas from a buffer of SSE lines.
///
/// Returns the deltas and whether the `[DONE]` sentinel was seen.
fn parse_sse_lines(buffer: &mut String) -> (Vec<String>, bool) {
    let mut deltas = Vec::new();
    let mut done = false;

    while let Some(newline) = buffer.find('\n') {
        let line: String = buffer.drain(..=newline).collect();
        let line = line.trim();
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data == "[DONE]" {
            done = true;
            continue;
        }
        if let Ok(chunk) = serde_json::from_str::<StreamChunk>(data) {
            if let Some(content) = chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
                if !content.is_empty() {
                    deltas.push(content);
                }
            }
        }
    }

    (deltas, done)
}

#[async_trait]
impl TextProvider for OpenAiTextProvider {
    async fn start_stream(&self, request: TextRequest) -> Result<mpsc::Receiver<TextDelta>, ProviderError> {
        let Some(api_key) = self.api_key.clone() else {
            return Err(ProviderError::NotConfigured("text"));
        };

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];
        for turn in &request.history {
            let role = match turn.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            messages.push(serde_json::json!({ "role": role, "content": turn.content }));
        }

        let body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "stream": true,
        });

        let send = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send();

        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout.as_millis() as u64))??;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let (tx, rx) = mpsc::channel(32);
        let idle_timeout = self.timeout;

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();

            loop {
                let next = match tokio::time::timeout(idle_timeout, stream.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        let _ = tx
                            .send(Err(ProviderError::Timeout(idle_timeout.as_millis() as u64)))
                            .await;
                        return;
                    }
                };

                match next {
                    Some(Ok(bytes)) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        let (deltas, done) = parse_sse_lines(&mut buffer);
                        for delta in deltas {
                            if tx.send(Ok(delta)).await.is_err() {
                                // Consumer dropped; stop reading.
                                return;
                            }
                        }
                        if done {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        let _ = tx.send(Err(ProviderError::Stream(e.to_string()))).await;
                        return;
                    }
                    None => return,
                }
            }
        });

        Ok(rx)
    }
}
