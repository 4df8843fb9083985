//! Scriptable mock providers for tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::speech::{SpeechProvider, SpeechRequest, SpeechResponse};
use crate::text::{TextDelta, TextProvider, TextRequest};
use crate::ProviderError;

/// Mock text provider replaying a scripted delta sequence
pub struct MockTextProvider {
    deltas: Vec<String>,
    /// Fail this many stream starts before succeeding
    fail_starts: Arc<AtomicU32>,
    /// Emit a mid-stream error after the scripted deltas
    fail_mid_stream: bool,
    /// Calls observed, for assertions
    pub calls: Arc<AtomicU32>,
}

impl MockTextProvider {
    pub fn new(deltas: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            deltas: deltas.into_iter().map(Into::into).collect(),
            fail_starts: Arc::new(AtomicU32::new(0)),
            fail_mid_stream: false,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Fail the first `n` calls to `start_stream`
    pub fn failing_starts(mut self, n: u32) -> Self {
        self.fail_starts = Arc::new(AtomicU32::new(n));
        self
    }

    /// Emit a mid-stream error after the scripted deltas
    pub fn failing_mid_stream(mut self) -> Self {
        self.fail_mid_stream = true;
        self
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn start_stream(&self, _request: TextRequest) -> Result<mpsc::Receiver<TextDelta>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fail_starts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_starts.store(remaining - 1, Ordering::SeqCst);
            return Err(ProviderError::StartFailed("scripted failure".to_string()));
        }

        let (tx, rx) = mpsc::channel(32);
        let deltas = self.deltas.clone();
        let fail_mid_stream = self.fail_mid_stream;

        tokio::spawn(async move {
            for delta in deltas {
                if tx.send(Ok(delta)).await.is_err() {
                    return;
                }
            }
            if fail_mid_stream {
                let _ = tx
                    .send(Err(ProviderError::Stream("scripted interruption".to_string())))
                    .await;
            }
        });

        Ok(rx)
    }
}

/// Mock speech provider returning fixed audio bytes
pub struct MockSpeechProvider {
    duration_ms: Option<u32>,
    fail: bool,
    configured: bool,
    pub calls: Arc<AtomicU32>,
}

impl MockSpeechProvider {
    pub fn new(duration_ms: Option<u32>) -> Self {
        Self {
            duration_ms,
            fail: false,
            configured: true,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Always fail with a timeout
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Report no credentials
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }
}

#[async_trait]
impl SpeechProvider for MockSpeechProvider {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.configured {
            return Err(ProviderError::NotConfigured("mock"));
        }
        if self.fail {
            return Err(ProviderError::Timeout(0));
        }

        // Deterministic fake payload proportional to the input
        let audio = vec![0u8; request.text.len().max(1) * 16];
        Ok(SpeechResponse { audio, format: "mp3", duration_ms: self.duration_ms })
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
