//! Turn orchestrator
//!
//! Drives one turn through its phases:
//! `Idle → Validating → Streaming → Persisted → Enriching → Idle`, with any
//! phase escalating to `Fallback → Idle` on unrecoverable error. Outbound
//! events go through the injected [`EventSink`], never a socket handle, so
//! the whole relay is exercisable in tests without a transport.
//!
//! Policy: at most one in-flight turn per session. A user message arriving
//! while a prior turn is still streaming or enriching is rejected with a
//! `busy` error event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use parla_config::PipelineConfig;
use parla_core::{
    AudioRef, Categorize, CharacterId, ErrorCategory, ServerEvent, StreamContext,
};
use parla_pipeline::stream::StreamEvent;
use parla_pipeline::{
    fallback_response, guess_emotion, validate_message, validation_response, AnimationGenerator,
    ResponseGenerator, VoiceSynthesizer,
};
use parla_session::ConversationManager;

use crate::health::{HealthMonitor, StreamProgress};
use crate::metrics;

/// Intensity for the facial animation of a normal turn
const TURN_INTENSITY: f32 = 0.8;

/// Outbound event destination, injected per connection.
///
/// `emit` returns false once the client is gone; the relay stops emitting.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: ServerEvent) -> bool;
}

/// Sink over a bounded channel drained by the socket writer task
pub struct ChannelSink {
    tx: mpsc::Sender<ServerEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<ServerEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&self, event: ServerEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

/// Turn phases, for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnPhase {
    Idle,
    Validating,
    Streaming,
    Persisted,
    Enriching,
    Fallback,
}

/// Per-connection turn driver
pub struct TurnOrchestrator {
    user_id: String,
    manager: Arc<ConversationManager>,
    generator: Arc<ResponseGenerator>,
    synthesizer: Arc<VoiceSynthesizer>,
    animations: AnimationGenerator,
    health: Arc<HealthMonitor>,
    max_message_chars: usize,
    stall_check_interval: Duration,
    stall_threshold: Duration,
    busy: AtomicBool,
}

impl TurnOrchestrator {
    pub fn new(
        user_id: impl Into<String>,
        manager: Arc<ConversationManager>,
        generator: Arc<ResponseGenerator>,
        synthesizer: Arc<VoiceSynthesizer>,
        health: Arc<HealthMonitor>,
        pipeline: &PipelineConfig,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            manager,
            generator,
            synthesizer,
            animations: AnimationGenerator::new(),
            health,
            max_message_chars: pipeline.max_message_chars,
            stall_check_interval: Duration::from_millis(pipeline.stall_check_interval_ms),
            stall_threshold: Duration::from_millis(pipeline.stall_threshold_ms),
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Run one turn for a user message, or reject it if one is in flight.
    pub async fn handle_user_message(&self, text: &str, sink: Arc<dyn EventSink>) {
        if self.busy.swap(true, Ordering::SeqCst) {
            let _ = sink
                .emit(ServerEvent::Error {
                    message: "a response is already in progress".to_string(),
                    error_type: Some("busy".to_string()),
                })
                .await;
            return;
        }

        metrics::record_turn();
        self.run_turn(text, sink).await;
        self.set_phase(TurnPhase::Idle);
        self.busy.store(false, Ordering::SeqCst);
    }

    async fn run_turn(&self, text: &str, sink: Arc<dyn EventSink>) {
        let session = match self.manager.get_current_session(&self.user_id).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                let _ = sink
                    .emit(ServerEvent::Error {
                        message: "no active session".to_string(),
                        error_type: Some("session".to_string()),
                    })
                    .await;
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "session lookup failed");
                let _ = sink
                    .emit(ServerEvent::Error {
                        message: "session lookup failed".to_string(),
                        error_type: Some("session".to_string()),
                    })
                    .await;
                return;
            }
        };
        let character_id = session.character_id;

        self.set_phase(TurnPhase::Validating);
        if let Err(e) = validate_message(text, self.max_message_chars) {
            self.health.track_error(&self.user_id, ErrorCategory::InputValidation);
            let fb = validation_response(&e, character_id);
            let duration_ms = fb.animation.duration_ms;
            if !sink
                .emit(ServerEvent::CharacterResponse {
                    text: fb.text,
                    emotion: Some(fb.emotion),
                    is_error: true,
                    fallback: false,
                })
                .await
            {
                return;
            }
            let _ = sink
                .emit(ServerEvent::VrmAnimation {
                    emotion: fb.emotion,
                    animation: fb.animation,
                    duration_ms: Some(duration_ms),
                })
                .await;
            return;
        }

        self.health.start_timer(&self.user_id);

        if !sink.emit(ServerEvent::CharacterThinking).await {
            self.health.end_timer(&self.user_id);
            return;
        }

        let history = match self.manager.append_user_message(&self.user_id, text).await {
            Ok(history) => history,
            Err(e) => {
                tracing::error!(error = %e, "failed to persist user message");
                self.emit_fallback(ErrorCategory::GeneralError, character_id, &sink).await;
                self.health.end_timer(&self.user_id);
                return;
            }
        };

        let context = StreamContext {
            character_id,
            user_id: self.user_id.clone(),
            session_id: session.id,
            language: session.language.clone(),
            history,
        };

        self.set_phase(TurnPhase::Streaming);
        let mut stream = match self.generator.generate(&context).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "generation failed to start");
                self.emit_fallback(e.category(), character_id, &sink).await;
                self.health.end_timer(&self.user_id);
                return;
            }
        };

        let progress = StreamProgress::new();
        let watcher = self.health.monitor_streaming_health(
            self.user_id.clone(),
            progress.clone(),
            self.stall_check_interval,
            self.stall_threshold,
        );

        let mut full_text = None;
        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Sentence(sentence) => {
                    progress.mark();
                    if !sink
                        .emit(ServerEvent::CharacterStream { text: sentence, is_complete: false })
                        .await
                    {
                        watcher.abort();
                        self.health.end_timer(&self.user_id);
                        return;
                    }
                }
                StreamEvent::Done { full_text: text } => {
                    full_text = Some(text);
                    break;
                }
                StreamEvent::Failed(e) => {
                    watcher.abort();
                    tracing::warn!(error = %e, "stream failed mid-flight");
                    self.emit_fallback(e.category(), character_id, &sink).await;
                    self.health.end_timer(&self.user_id);
                    return;
                }
            }
        }
        watcher.abort();

        // A closed channel without Done, or an all-whitespace stream, counts
        // as a provider failure.
        let full_text = match full_text.filter(|t| !t.is_empty()) {
            Some(text) => text,
            None => {
                self.emit_fallback(ErrorCategory::ProviderFailure, character_id, &sink).await;
                self.health.end_timer(&self.user_id);
                return;
            }
        };
        let _ = sink
            .emit(ServerEvent::CharacterStream { text: String::new(), is_complete: true })
            .await;

        self.set_phase(TurnPhase::Persisted);
        let emotion = guess_emotion(&full_text);
        if let Err(e) = self
            .manager
            .append_character_message(&self.user_id, &full_text, Some(emotion), None, None)
            .await
        {
            // The text has already streamed; log and keep going.
            tracing::error!(error = %e, "failed to persist character message");
            self.health.track_error(&self.user_id, ErrorCategory::GeneralError);
        }

        if !sink
            .emit(ServerEvent::CharacterResponse {
                text: full_text.clone(),
                emotion: Some(emotion),
                is_error: false,
                fallback: false,
            })
            .await
        {
            self.health.end_timer(&self.user_id);
            return;
        }

        // Voice and facial animation are independent: each emits its own
        // event when ready, and a failure in one never touches the other or
        // the already-delivered text.
        self.set_phase(TurnPhase::Enriching);
        let voice = {
            let synthesizer = self.synthesizer.clone();
            let animations = self.animations;
            let sink = sink.clone();
            let text = full_text.clone();
            tokio::spawn(async move {
                let result = synthesizer.synthesize(&text, character_id, Some(emotion)).await;
                let lip_sync = animations.lip_sync_animation(character_id, &result.visemes);

                if let AudioRef::Url(url) = &result.audio {
                    if !sink
                        .emit(ServerEvent::VoiceAudio {
                            audio_url: url.clone(),
                            text,
                            character_id: character_id.as_str().to_string(),
                            emotion,
                            duration_ms: Some(result.duration_ms),
                        })
                        .await
                    {
                        return;
                    }
                } else {
                    tracing::debug!("audio artifact not addressable, skipping voice event");
                }
                let _ = sink
                    .emit(ServerEvent::VrmAnimation {
                        emotion,
                        animation: lip_sync,
                        duration_ms: Some(result.duration_ms),
                    })
                    .await;
            })
        };
        let facial = {
            let animations = self.animations;
            let sink = sink.clone();
            tokio::spawn(async move {
                let animation = animations.emotion_animation(character_id, emotion, TURN_INTENSITY);
                let duration_ms = animation.duration_ms;
                let _ = sink
                    .emit(ServerEvent::VrmAnimation { emotion, animation, duration_ms: Some(duration_ms) })
                    .await;
            })
        };
        let _ = tokio::join!(voice, facial);

        self.health.end_timer(&self.user_id);
    }

    async fn emit_fallback(
        &self,
        category: ErrorCategory,
        character_id: CharacterId,
        sink: &Arc<dyn EventSink>,
    ) {
        self.set_phase(TurnPhase::Fallback);
        self.health.track_error(&self.user_id, category);

        let fb = fallback_response(category, character_id);
        let duration_ms = fb.animation.duration_ms;
        if !sink
            .emit(ServerEvent::CharacterResponse {
                text: fb.text,
                emotion: Some(fb.emotion),
                is_error: true,
                fallback: true,
            })
            .await
        {
            return;
        }
        let _ = sink
            .emit(ServerEvent::VrmAnimation {
                emotion: fb.emotion,
                animation: fb.animation,
                duration_ms: Some(duration_ms),
            })
            .await;
    }

    fn set_phase(&self, phase: TurnPhase) {
        tracing::trace!(user_id = %self.user_id, ?phase, "turn phase");
    }
}
