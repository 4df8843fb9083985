//! End-to-end relay tests over mock providers and a collecting event sink

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};

use parla_config::PipelineConfig;
use chrono::{DateTime, Utc};
use parla_core::{CharacterId, ConversationMessage, ErrorCategory, ServerEvent};
use uuid::Uuid;
use parla_pipeline::{
    fallback_response, ResponseGenerator, VoiceSynthesizer, VoiceSynthesizerConfig,
};
use parla_providers::mock::{MockSpeechProvider, MockTextProvider};
use parla_providers::{ProviderError, RetryPolicy, TextDelta, TextProvider, TextRequest};
use parla_server::{EventSink, HealthMonitor, TurnOrchestrator};
use parla_session::{
    ConversationManager, InMemorySessionStore, MessageStore, SessionError,
};

struct CollectingSink {
    events: Mutex<Vec<ServerEvent>>,
}

impl CollectingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self { events: Mutex::new(Vec::new()) })
    }

    fn events(&self) -> Vec<ServerEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn emit(&self, event: ServerEvent) -> bool {
        self.events.lock().push(event);
        true
    }
}

struct Harness {
    orchestrator: Arc<TurnOrchestrator>,
    manager: Arc<ConversationManager>,
    health: Arc<HealthMonitor>,
    sink: Arc<CollectingSink>,
}

fn harness(text_provider: Arc<dyn TextProvider>, speech: MockSpeechProvider, dir: &str) -> Harness {
    harness_with_manager(
        Arc::new(ConversationManager::in_memory(20)),
        text_provider,
        speech,
        dir,
    )
}

fn harness_with_manager(
    manager: Arc<ConversationManager>,
    text_provider: Arc<dyn TextProvider>,
    speech: MockSpeechProvider,
    dir: &str,
) -> Harness {
    let generator = Arc::new(
        ResponseGenerator::new(text_provider, "primary", "fallback", RetryPolicy::default())
            .with_delay(Arc::new(|_| Box::pin(async {}))),
    );
    let synthesizer = Arc::new(VoiceSynthesizer::new(
        Arc::new(speech),
        None,
        VoiceSynthesizerConfig {
            artifact_dir: std::env::temp_dir().join(dir),
            ..Default::default()
        },
    ));
    let health = Arc::new(HealthMonitor::new());

    let orchestrator = Arc::new(TurnOrchestrator::new(
        "u1",
        manager.clone(),
        generator,
        synthesizer,
        health.clone(),
        &PipelineConfig::default(),
    ));

    Harness { orchestrator, manager, health, sink: CollectingSink::new() }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn chunk_texts(events: &[ServerEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::CharacterStream { text, .. } if !text.is_empty() => Some(text.clone()),
            _ => None,
        })
        .collect()
}

fn responses(events: &[ServerEvent]) -> Vec<(String, bool, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::CharacterResponse { text, is_error, fallback, .. } => {
                Some((text.clone(), *is_error, *fallback))
            }
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_hola_turn_emits_ordered_events() {
    let provider = Arc::new(MockTextProvider::new(["¡Hola! ", "¿Cómo estás?"]));
    let h = harness(provider, MockSpeechProvider::new(Some(1200)), "parla-relay-happy");
    h.manager
        .start_conversation("u1", CharacterId::Maria, None)
        .await
        .unwrap();

    h.orchestrator
        .handle_user_message("Hola", h.sink.clone())
        .await;

    let events = h.sink.events();
    assert!(matches!(events[0], ServerEvent::CharacterThinking));

    let chunks = chunk_texts(&events);
    assert!(!chunks.is_empty());

    let responses = responses(&events);
    assert_eq!(responses.len(), 1);
    let (text, is_error, fallback) = &responses[0];
    assert!(!is_error);
    assert!(!fallback);
    assert_eq!(normalize(&chunks.join(" ")), normalize(text));

    // Chunks arrive before the final response
    let first_chunk = events
        .iter()
        .position(|e| matches!(e, ServerEvent::CharacterStream { .. }))
        .unwrap();
    let response_at = events
        .iter()
        .position(|e| matches!(e, ServerEvent::CharacterResponse { .. }))
        .unwrap();
    assert!(first_chunk < response_at);

    let voice: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::VoiceAudio { duration_ms, .. } => Some(*duration_ms),
            _ => None,
        })
        .collect();
    assert_eq!(voice.len(), 1);
    assert!(voice[0].unwrap() > 0);

    assert!(events.iter().any(|e| matches!(e, ServerEvent::VrmAnimation { .. })));

    // Both sides of the turn were persisted
    let history = h.manager.append_user_message("u1", "next").await.unwrap();
    assert_eq!(history.len(), 3);
}

#[tokio::test]
async fn test_whitespace_message_never_reaches_providers() {
    let provider = Arc::new(MockTextProvider::new(["ignored"]));
    let text_calls = provider.calls.clone();
    let speech = MockSpeechProvider::new(Some(1000));
    let speech_calls = speech.calls.clone();
    let h = harness(provider, speech, "parla-relay-whitespace");
    h.manager
        .start_conversation("u1", CharacterId::Maria, None)
        .await
        .unwrap();

    h.orchestrator
        .handle_user_message("   ", h.sink.clone())
        .await;

    let events = h.sink.events();
    assert!(chunk_texts(&events).is_empty());
    assert!(!events.iter().any(|e| matches!(e, ServerEvent::CharacterStream { .. })));

    let responses = responses(&events);
    assert_eq!(responses.len(), 1);
    assert!(responses[0].1);

    assert_eq!(text_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(speech_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_provider_failure_yields_deterministic_fallback() {
    // More start failures than both models' retry budgets combined
    let provider = Arc::new(MockTextProvider::new(["x"]).failing_starts(10));
    let h = harness(provider, MockSpeechProvider::new(None), "parla-relay-failure");
    h.manager
        .start_conversation("u1", CharacterId::Maria, None)
        .await
        .unwrap();

    h.orchestrator
        .handle_user_message("Hola", h.sink.clone())
        .await;

    let events = h.sink.events();
    let responses = responses(&events);
    assert_eq!(responses.len(), 1);

    let expected = fallback_response(ErrorCategory::ProviderFailure, CharacterId::Maria);
    let (text, is_error, fallback) = &responses[0];
    assert_eq!(text, &expected.text);
    assert!(*is_error);
    assert!(*fallback);

    assert_eq!(
        h.health.error_count("u1", ErrorCategory::ProviderFailure),
        1
    );
}

#[tokio::test]
async fn test_mid_stream_failure_falls_back_after_chunks() {
    let provider = Arc::new(MockTextProvider::new(["Lo siento. "]).failing_mid_stream());
    let h = harness(provider, MockSpeechProvider::new(None), "parla-relay-midstream");
    h.manager
        .start_conversation("u1", CharacterId::Maria, None)
        .await
        .unwrap();

    h.orchestrator
        .handle_user_message("Hola", h.sink.clone())
        .await;

    let events = h.sink.events();
    assert_eq!(chunk_texts(&events), vec!["Lo siento."]);

    let responses = responses(&events);
    assert_eq!(responses.len(), 1);
    assert!(responses[0].1);
    assert!(responses[0].2);
    assert_eq!(
        h.health.error_count("u1", ErrorCategory::ProviderFailure),
        1
    );
}

/// Message store that refuses every write
struct FailingMessageStore;

#[async_trait]
impl MessageStore for FailingMessageStore {
    async fn append(&self, _message: ConversationMessage) -> Result<(), SessionError> {
        Err(SessionError::Store("write refused".to_string()))
    }

    async fn recent(
        &self,
        _session_id: Uuid,
        _limit: usize,
    ) -> Result<Vec<ConversationMessage>, SessionError> {
        Ok(Vec::new())
    }

    async fn last_activity(
        &self,
        _session_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, SessionError> {
        Ok(None)
    }

    async fn remove_session(&self, _session_id: Uuid) -> Result<(), SessionError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_thinking_signal_precedes_persistence() {
    let provider = Arc::new(MockTextProvider::new(["ignored"]));
    let text_calls = provider.calls.clone();
    let manager = Arc::new(ConversationManager::new(
        InMemorySessionStore::new(),
        Arc::new(FailingMessageStore),
        20,
    ));
    let h = harness_with_manager(
        manager,
        provider,
        MockSpeechProvider::new(None),
        "parla-relay-store-failure",
    );
    h.manager
        .start_conversation("u1", CharacterId::Maria, None)
        .await
        .unwrap();

    h.orchestrator
        .handle_user_message("Hola", h.sink.clone())
        .await;

    // The thinking signal goes out before history is touched, so it is
    // emitted even when the store rejects the write
    let events = h.sink.events();
    assert!(matches!(events[0], ServerEvent::CharacterThinking));

    let responses = responses(&events);
    assert_eq!(responses.len(), 1);
    let expected = fallback_response(ErrorCategory::GeneralError, CharacterId::Maria);
    assert_eq!(responses[0].0, expected.text);
    assert!(responses[0].1);

    // Generation never starts when the user message cannot be persisted
    assert_eq!(text_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

/// Provider that holds the stream start until released
struct GatedTextProvider {
    gate: Arc<Notify>,
}

#[async_trait]
impl TextProvider for GatedTextProvider {
    async fn start_stream(
        &self,
        _request: TextRequest,
    ) -> Result<mpsc::Receiver<TextDelta>, ProviderError> {
        self.gate.notified().await;
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            let _ = tx.send(Ok("Listo. ".to_string())).await;
        });
        Ok(rx)
    }
}

#[tokio::test]
async fn test_message_during_inflight_turn_is_rejected() {
    let gate = Arc::new(Notify::new());
    let provider = Arc::new(GatedTextProvider { gate: gate.clone() });
    let h = harness(provider, MockSpeechProvider::new(Some(800)), "parla-relay-busy");
    h.manager
        .start_conversation("u1", CharacterId::Maria, None)
        .await
        .unwrap();

    let first = tokio::spawn({
        let orchestrator = h.orchestrator.clone();
        let sink = h.sink.clone();
        async move {
            orchestrator.handle_user_message("Hola", sink).await;
        }
    });
    while !h.orchestrator.is_busy() {
        tokio::task::yield_now().await;
    }

    h.orchestrator
        .handle_user_message("Otra cosa", h.sink.clone())
        .await;

    let busy_errors = h
        .sink
        .events()
        .iter()
        .filter(|e| {
            matches!(e, ServerEvent::Error { error_type: Some(t), .. } if t == "busy")
        })
        .count();
    assert_eq!(busy_errors, 1);

    gate.notify_one();
    first.await.unwrap();

    // The original turn still completed normally
    let responses = responses(&h.sink.events());
    assert_eq!(responses.len(), 1);
    assert!(!responses[0].1);
    assert!(!h.orchestrator.is_busy());
}
