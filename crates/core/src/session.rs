//! Session and conversation types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::animation::Animation;
use crate::audio::AudioResult;
use crate::character::CharacterId;

/// A bounded user+character+language conversational context.
///
/// At most one session per user is active at any time. A session is immutable
/// once ended, except for `end_time` being set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    pub character_id: CharacterId,
    pub language: String,
    pub personality_mode: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Session {
    pub fn new(user_id: impl Into<String>, character_id: CharacterId, language: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            character_id,
            language: language.into(),
            personality_mode: "friendly".to_string(),
            start_time: Utc::now(),
            end_time: None,
            is_active: true,
        }
    }
}

/// Who produced a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Character,
}

/// One append-only message within a session, ordered by timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub session_id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub detected_languages: Vec<String>,
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_data: Option<Animation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_data: Option<AudioResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cultural_context: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_data: Option<serde_json::Value>,
}

impl ConversationMessage {
    pub fn user(session_id: Uuid, text: impl Into<String>) -> Self {
        Self::new(session_id, Sender::User, text)
    }

    pub fn character(session_id: Uuid, text: impl Into<String>) -> Self {
        Self::new(session_id, Sender::Character, text)
    }

    fn new(session_id: Uuid, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            session_id,
            sender,
            text: text.into(),
            timestamp: Utc::now(),
            detected_languages: Vec::new(),
            emotions: Vec::new(),
            animation_data: None,
            voice_data: None,
            cultural_context: None,
            translation_data: None,
        }
    }
}

/// Role in provider-facing chat history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl From<Sender> for ChatRole {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => ChatRole::User,
            Sender::Character => ChatRole::Assistant,
        }
    }
}

/// One role/content pair of provider chat history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Ephemeral per-turn input to the streaming response generator.
///
/// Built from the session manager's bounded history window; the last entry is
/// the user message that triggered the turn.
#[derive(Debug, Clone)]
pub struct StreamContext {
    pub character_id: CharacterId,
    pub user_id: String,
    pub session_id: Uuid,
    pub language: String,
    pub history: Vec<ChatTurn>,
}
