//! Streaming response generation
//!
//! Turns the provider's token/delta stream into an ordered sequence of
//! complete sentences plus the final full text, delivered over a bounded
//! channel. Model fallback applies only when the primary stream fails to
//! start; there is no mid-stream provider switching.

use std::sync::Arc;
use tokio::sync::mpsc;

use parla_core::StreamContext;
use parla_providers::{ProviderError, Retry, RetryPolicy, TextProvider, TextRequest};
use parla_providers::retry::DelayFn;

use crate::characters::CharacterProfile;
use crate::PipelineError;

/// Sentence boundary: terminal punctuation followed by whitespace or end of
/// input. CJK terminals split without requiring whitespace, since those
/// scripts do not use it. Locale-naive by design; abbreviations may
/// mis-segment.
#[derive(Debug, Default)]
pub struct SentenceChunker {
    buffer: String,
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…')
}

fn is_cjk_terminal(c: char) -> bool {
    matches!(c, '。' | '！' | '？')
}

impl SentenceChunker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a delta; returns any complete sentences it closed.
    pub fn push(&mut self, delta: &str) -> Vec<String> {
        self.buffer.push_str(delta);

        let mut sentences = Vec::new();
        let mut cut = 0;
        let mut chars = self.buffer.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            let boundary = if is_cjk_terminal(c) {
                true
            } else if is_terminal(c) {
                matches!(chars.peek(), Some((_, next)) if next.is_whitespace())
            } else {
                false
            };

            if boundary {
                let end = i + c.len_utf8();
                let sentence = self.buffer[cut..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                cut = end;
            }
        }

        if cut > 0 {
            self.buffer.drain(..cut);
        }

        sentences
    }

    /// End of input: return the non-empty remainder regardless of punctuation.
    pub fn flush(&mut self) -> Option<String> {
        let remainder = std::mem::take(&mut self.buffer);
        let remainder = remainder.trim();
        (!remainder.is_empty()).then(|| remainder.to_string())
    }
}

/// One item of a response stream
#[derive(Debug)]
pub enum StreamEvent {
    /// A complete sentence, in order
    Sentence(String),
    /// Stream finished; sentences joined with single spaces, trimmed
    Done { full_text: String },
    /// The stream failed mid-flight
    Failed(PipelineError),
}

/// Lazy, finite, non-restartable sequence of stream events
pub struct ResponseStream {
    rx: mpsc::Receiver<StreamEvent>,
}

impl ResponseStream {
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }
}

/// Streaming response generator with model fallback
pub struct ResponseGenerator {
    provider: Arc<dyn TextProvider>,
    primary_model: String,
    fallback_model: String,
    retry_policy: RetryPolicy,
    delay: Option<DelayFn>,
}

impl ResponseGenerator {
    pub fn new(
        provider: Arc<dyn TextProvider>,
        primary_model: impl Into<String>,
        fallback_model: impl Into<String>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            primary_model: primary_model.into(),
            fallback_model: fallback_model.into(),
            retry_policy,
            delay: None,
        }
    }

    /// Inject a delay function for tests
    pub fn with_delay(mut self, delay: DelayFn) -> Self {
        self.delay = Some(delay);
        self
    }

    fn retry(&self) -> Retry {
        match &self.delay {
            Some(delay) => Retry::with_delay(self.retry_policy, delay.clone()),
            None => Retry::new(self.retry_policy),
        }
    }

    async fn start_with_retry(
        &self,
        model: &str,
        context: &StreamContext,
    ) -> Result<mpsc::Receiver<parla_providers::TextDelta>, ProviderError> {
        let profile = CharacterProfile::of(context.character_id);
        let request = TextRequest {
            model: model.to_string(),
            system_prompt: profile.system_prompt(&context.language),
            history: context.history.clone(),
        };

        self.retry()
            .run(
                || self.provider.start_stream(request.clone()),
                ProviderError::is_transient,
            )
            .await
    }

    /// Start generation for a turn.
    ///
    /// Fails only when neither model's stream can be started; mid-stream
    /// failures surface as a `Failed` event.
    pub async fn generate(&self, context: &StreamContext) -> Result<ResponseStream, PipelineError> {
        let deltas = match self.start_with_retry(&self.primary_model, context).await {
            Ok(rx) => rx,
            Err(primary_err) => {
                tracing::warn!(
                    model = %self.primary_model,
                    error = %primary_err,
                    "primary model failed to start, falling back"
                );
                self.start_with_retry(&self.fallback_model, context).await?
            }
        };

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(relay_deltas(deltas, tx));

        Ok(ResponseStream { rx })
    }
}

async fn relay_deltas(
    mut deltas: mpsc::Receiver<parla_providers::TextDelta>,
    tx: mpsc::Sender<StreamEvent>,
) {
    let mut chunker = SentenceChunker::new();
    let mut sentences: Vec<String> = Vec::new();

    while let Some(delta) = deltas.recv().await {
        match delta {
            Ok(text) => {
                for sentence in chunker.push(&text) {
                    sentences.push(sentence.clone());
                    if tx.send(StreamEvent::Sentence(sentence)).await.is_err() {
                        return;
                    }
                }
            }
            Err(err) => {
                let _ = tx.send(StreamEvent::Failed(err.into())).await;
                return;
            }
        }
    }

    if let Some(remainder) = chunker.flush() {
        sentences.push(remainder.clone());
        if tx.send(StreamEvent::Sentence(remainder)).await.is_err() {
            return;
        }
    }

    let full_text = sentences.join(" ").trim().to_string();
    let _ = tx.send(StreamEvent::Done { full_text }).await;
}
