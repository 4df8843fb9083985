//! WebSocket connection handler
//!
//! One logical session per connection: connecting starts a session with the
//! default character, client events are dispatched from the receive loop,
//! and all outbound events funnel through a writer task so turn tasks never
//! contend for the socket.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use parla_core::{CharacterId, ClientEvent, ServerEvent};

use crate::metrics;
use crate::rate_limit::RateLimiter;
use crate::relay::{ChannelSink, EventSink, TurnOrchestrator};
use crate::state::AppState;

const DEFAULT_CHARACTER: CharacterId = CharacterId::Maria;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    let user_id = params
        .get("userId")
        .cloned()
        .unwrap_or_else(|| format!("anon-{}", uuid::Uuid::new_v4()));

    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

async fn handle_socket(socket: WebSocket, user_id: String, state: AppState) {
    metrics::record_ws_connection();
    tracing::info!(user_id, "client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (event_tx, mut event_rx) = mpsc::channel::<ServerEvent>(64);

    let writer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize server event");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });
    let sink: Arc<dyn EventSink> = Arc::new(ChannelSink::new(event_tx));

    // Every connection begins with a fresh default-character session.
    let session = match state
        .manager
        .start_conversation(&user_id, DEFAULT_CHARACTER, None)
        .await
    {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "failed to start session");
            let _ = sink
                .emit(ServerEvent::Error {
                    message: "failed to start session".to_string(),
                    error_type: Some("session".to_string()),
                })
                .await;
            writer.abort();
            return;
        }
    };
    let _ = sink
        .emit(ServerEvent::CharacterSwitched {
            character_id: session.character_id.as_str().to_string(),
            language: session.language.clone(),
            session_id: session.id.to_string(),
        })
        .await;

    let orchestrator = Arc::new(TurnOrchestrator::new(
        user_id.clone(),
        state.manager.clone(),
        state.generator.clone(),
        state.synthesizer.clone(),
        state.health.clone(),
        &state.settings.pipeline,
    ));
    let mut limiter = RateLimiter::new(state.settings.server.rate_limit.clone());
    let mut turns: Vec<JoinHandle<()>> = Vec::new();

    while let Some(Ok(message)) = ws_rx.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        if limiter.check_message().is_err() {
            let _ = sink
                .emit(ServerEvent::Error {
                    message: "too many messages, slow down".to_string(),
                    error_type: Some("rate_limit".to_string()),
                })
                .await;
            continue;
        }

        let event: ClientEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(error = %e, "unparseable client event");
                let _ = sink
                    .emit(ServerEvent::Error {
                        message: "unrecognized event".to_string(),
                        error_type: Some("protocol".to_string()),
                    })
                    .await;
                continue;
            }
        };

        match event {
            ClientEvent::UserMessage { text } => {
                let orchestrator = orchestrator.clone();
                let sink = sink.clone();
                turns.retain(|turn| !turn.is_finished());
                turns.push(tokio::spawn(async move {
                    orchestrator.handle_user_message(&text, sink).await;
                }));
            }
            ClientEvent::SwitchCharacter { character_id } => {
                let id = match character_id.parse::<CharacterId>() {
                    Ok(id) => id,
                    Err(e) => {
                        let _ = sink
                            .emit(ServerEvent::Error {
                                message: e.to_string(),
                                error_type: Some("input_validation".to_string()),
                            })
                            .await;
                        continue;
                    }
                };
                match state.manager.switch_character(&user_id, id).await {
                    Ok(session) => {
                        let _ = sink
                            .emit(ServerEvent::CharacterSwitched {
                                character_id: id.as_str().to_string(),
                                language: session.language.clone(),
                                session_id: session.id.to_string(),
                            })
                            .await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "character switch failed");
                        let _ = sink
                            .emit(ServerEvent::Error {
                                message: "character switch failed".to_string(),
                                error_type: Some("session".to_string()),
                            })
                            .await;
                    }
                }
            }
            ClientEvent::SwitchLanguage { language } => {
                match state.manager.switch_language(&user_id, &language).await {
                    Ok(_) => {
                        let _ = sink
                            .emit(ServerEvent::LanguageSwitched { mode: language })
                            .await;
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "language switch failed");
                        let _ = sink
                            .emit(ServerEvent::Error {
                                message: "no active session".to_string(),
                                error_type: Some("session".to_string()),
                            })
                            .await;
                    }
                }
            }
        }
    }

    // Disconnect: stop emitting, drop in-flight work, end the session.
    for turn in turns {
        turn.abort();
    }
    if let Err(e) = state.manager.end_session(&user_id).await {
        tracing::warn!(error = %e, "failed to end session on disconnect");
    }
    writer.abort();
    tracing::info!(user_id, "client disconnected");
}
