//! WebSocket event protocol
//!
//! Internally tagged enums; variant names are the wire event names, fields
//! are camelCase to match the client payload shapes.

use serde::{Deserialize, Serialize};

use crate::animation::Animation;
use crate::character::Emotion;

/// Client → server events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// A typed user message starting a turn
    UserMessage { text: String },
    /// Switch to another character (ends the current session)
    SwitchCharacter { character_id: String },
    /// Switch the active session's language
    SwitchLanguage { language: String },
}

/// Server → client events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// The character is composing a reply
    CharacterThinking,
    /// One streamed sentence chunk
    CharacterStream { text: String, is_complete: bool },
    /// The final complete response for a turn
    CharacterResponse {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        emotion: Option<Emotion>,
        is_error: bool,
        #[serde(skip_serializing_if = "std::ops::Not::not", default)]
        fallback: bool,
    },
    /// Synthesized speech for the final response
    VoiceAudio {
        audio_url: String,
        text: String,
        character_id: String,
        emotion: Emotion,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u32>,
    },
    /// Facial/body animation for the final response
    VrmAnimation {
        emotion: Emotion,
        animation: Animation,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u32>,
    },
    /// Result of a character switch
    CharacterSwitched {
        character_id: String,
        language: String,
        session_id: String,
    },
    /// Result of a language switch
    LanguageSwitched { mode: String },
    /// Transport-visible error
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_type: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_parse() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"user_message","text":"Hola"}"#).unwrap();
        match event {
            ClientEvent::UserMessage { text } => assert_eq!(text, "Hola"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_stream_event_wire_shape() {
        let event = ServerEvent::CharacterStream { text: "Hola.".to_string(), is_complete: false };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "character_stream");
        assert_eq!(json["isComplete"], false);
    }

    #[test]
    fn test_response_omits_empty_options() {
        let event = ServerEvent::CharacterResponse {
            text: "Hola".to_string(),
            emotion: None,
            is_error: false,
            fallback: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("emotion").is_none());
        assert!(json.get("fallback").is_none());
    }
}
