//! Conversation manager
//!
//! User-keyed session lifecycle and conversation history. Start/switch paths
//! hold a manager-level lock so that deactivating the prior session and
//! creating the replacement is atomic: concurrent starts for the same user
//! race on which session wins, but never leave two active.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parla_core::{
    Animation, AudioResult, CharacterId, ChatTurn, ConversationMessage, Emotion, Session,
};
use tokio::sync::watch;

use crate::store::{InMemoryMessageStore, InMemorySessionStore, MessageStore, SessionStore};
use crate::SessionError;

/// User-keyed session lifecycle and history manager
pub struct ConversationManager {
    sessions: Arc<dyn SessionStore>,
    messages: Arc<dyn MessageStore>,
    history_limit: usize,
    start_lock: tokio::sync::Mutex<()>,
}

impl ConversationManager {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        messages: Arc<dyn MessageStore>,
        history_limit: usize,
    ) -> Self {
        Self { sessions, messages, history_limit, start_lock: tokio::sync::Mutex::new(()) }
    }

    /// Manager over fresh in-memory stores.
    pub fn in_memory(history_limit: usize) -> Self {
        Self::new(
            InMemorySessionStore::new(),
            InMemoryMessageStore::new(),
            history_limit,
        )
    }

    /// Start a conversation, deactivating any prior active session first.
    ///
    /// When `language` is `None` the character's default language is used.
    pub async fn start_conversation(
        &self,
        user_id: &str,
        character_id: CharacterId,
        language: Option<&str>,
    ) -> Result<Session, SessionError> {
        let _guard = self.start_lock.lock().await;

        if let Some(prior) = self.sessions.active_for_user(user_id).await? {
            self.deactivate(prior).await?;
        }

        let language = language.unwrap_or_else(|| character_id.default_language());
        let session = Session::new(user_id, character_id, language);
        tracing::info!(
            user_id,
            session_id = %session.id,
            character = character_id.as_str(),
            language,
            "conversation started"
        );
        self.sessions.insert(session.clone()).await?;
        Ok(session)
    }

    pub async fn get_current_session(&self, user_id: &str) -> Result<Option<Session>, SessionError> {
        self.sessions.active_for_user(user_id).await
    }

    /// Append the user's message and return the bounded history window,
    /// ending with this message, as provider-facing role/content pairs.
    pub async fn append_user_message(
        &self,
        user_id: &str,
        text: &str,
    ) -> Result<Vec<ChatTurn>, SessionError> {
        let session = self.require_active(user_id).await?;

        self.messages
            .append(ConversationMessage::user(session.id, text))
            .await?;

        let recent = self.messages.recent(session.id, self.history_limit).await?;
        Ok(recent
            .into_iter()
            .map(|m| ChatTurn::new(m.sender.into(), m.text))
            .collect())
    }

    /// Persist the character's reply with its enrichment payloads.
    pub async fn append_character_message(
        &self,
        user_id: &str,
        text: &str,
        emotion: Option<Emotion>,
        animation: Option<Animation>,
        voice: Option<AudioResult>,
    ) -> Result<(), SessionError> {
        let session = self.require_active(user_id).await?;

        let mut message = ConversationMessage::character(session.id, text);
        if let Some(emotion) = emotion {
            message.emotions.push(emotion.as_str().to_string());
        }
        message.animation_data = animation;
        message.voice_data = voice;
        self.messages.append(message).await
    }

    /// End the current session (if any) and start one with the new character
    /// in its default language.
    pub async fn switch_character(
        &self,
        user_id: &str,
        character_id: CharacterId,
    ) -> Result<Session, SessionError> {
        self.start_conversation(user_id, character_id, None).await
    }

    /// Change the active session's language in place.
    pub async fn switch_language(
        &self,
        user_id: &str,
        language: &str,
    ) -> Result<Session, SessionError> {
        let mut session = self.require_active(user_id).await?;
        session.language = language.to_string();
        self.sessions.update(session.clone()).await?;
        Ok(session)
    }

    /// End the user's active session. Idempotent: a user with no active
    /// session is not an error.
    pub async fn end_session(&self, user_id: &str) -> Result<(), SessionError> {
        match self.sessions.active_for_user(user_id).await? {
            Some(session) => self.deactivate(session).await,
            None => Ok(()),
        }
    }

    /// End sessions idle past the timeout. Returns how many were ended.
    pub async fn cleanup_idle(&self, idle_timeout: Duration) -> Result<usize, SessionError> {
        let now = Utc::now();
        let mut ended = 0;

        for session in self.sessions.active_sessions().await? {
            let last_activity = self
                .messages
                .last_activity(session.id)
                .await?
                .unwrap_or(session.start_time);
            let idle = (now - last_activity).to_std().unwrap_or(Duration::ZERO);
            if idle >= idle_timeout {
                tracing::info!(session_id = %session.id, idle_secs = idle.as_secs(), "ending idle session");
                let session_id = session.id;
                self.deactivate(session).await?;
                // Idle sessions also give up their history to bound memory.
                self.messages.remove_session(session_id).await?;
                ended += 1;
            }
        }
        Ok(ended)
    }

    /// Number of currently active sessions, for readiness reporting.
    pub async fn active_session_count(&self) -> Result<usize, SessionError> {
        Ok(self.sessions.active_sessions().await?.len())
    }

    async fn require_active(&self, user_id: &str) -> Result<Session, SessionError> {
        self.sessions
            .active_for_user(user_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(user_id.to_string()))
    }

    async fn deactivate(&self, mut session: Session) -> Result<(), SessionError> {
        session.is_active = false;
        if session.end_time.is_none() {
            session.end_time = Some(Utc::now());
        }
        self.sessions.update(session).await
    }
}

/// Periodic idle-session cleanup, stopped via the shutdown channel.
pub async fn run_cleanup(
    manager: Arc<ConversationManager>,
    interval: Duration,
    idle_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match manager.cleanup_idle(idle_timeout).await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(ended = n, "idle session cleanup pass"),
                    Err(e) => tracing::warn!(error = %e, "idle session cleanup failed"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::debug!("session cleanup task stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parla_core::ChatRole;

    #[tokio::test]
    async fn test_start_deactivates_prior_session() {
        let manager = ConversationManager::in_memory(20);

        let first = manager
            .start_conversation("u1", CharacterId::Maria, None)
            .await
            .unwrap();
        let second = manager
            .start_conversation("u1", CharacterId::Maria, None)
            .await
            .unwrap();

        let current = manager.get_current_session("u1").await.unwrap().unwrap();
        assert_eq!(current.id, second.id);
        assert_ne!(current.id, first.id);
    }

    #[tokio::test]
    async fn test_default_language_from_character() {
        let manager = ConversationManager::in_memory(20);

        let session = manager
            .start_conversation("u1", CharacterId::Akira, None)
            .await
            .unwrap();
        assert_eq!(session.language, "ja");

        let overridden = manager
            .start_conversation("u2", CharacterId::Akira, Some("en"))
            .await
            .unwrap();
        assert_eq!(overridden.language, "en");
    }

    #[tokio::test]
    async fn test_user_message_returns_bounded_history() {
        let manager = ConversationManager::in_memory(3);
        manager
            .start_conversation("u1", CharacterId::Maria, None)
            .await
            .unwrap();

        for i in 0..4 {
            manager
                .append_user_message("u1", &format!("m{i}"))
                .await
                .unwrap();
            manager
                .append_character_message("u1", &format!("r{i}"), None, None, None)
                .await
                .unwrap();
        }
        let history = manager.append_user_message("u1", "latest").await.unwrap();

        assert_eq!(history.len(), 3);
        let last = history.last().unwrap();
        assert_eq!(last.role, ChatRole::User);
        assert_eq!(last.content, "latest");
        // The window keeps the newest messages only
        assert_eq!(history[0].content, "m3");
    }

    #[tokio::test]
    async fn test_append_without_session_fails() {
        let manager = ConversationManager::in_memory(20);
        assert!(matches!(
            manager.append_user_message("ghost", "hola").await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_switch_character_starts_fresh_session() {
        let manager = ConversationManager::in_memory(20);
        let first = manager
            .start_conversation("u1", CharacterId::Maria, None)
            .await
            .unwrap();

        let switched = manager
            .switch_character("u1", CharacterId::Chloe)
            .await
            .unwrap();

        assert_ne!(switched.id, first.id);
        assert_eq!(switched.character_id, CharacterId::Chloe);
        assert_eq!(switched.language, "fr");
    }

    #[tokio::test]
    async fn test_switch_language_requires_active_session() {
        let manager = ConversationManager::in_memory(20);
        assert!(matches!(
            manager.switch_language("u1", "en").await,
            Err(SessionError::NotFound(_))
        ));

        manager
            .start_conversation("u1", CharacterId::Maria, None)
            .await
            .unwrap();
        let session = manager.switch_language("u1", "en").await.unwrap();
        assert_eq!(session.language, "en");
    }

    #[tokio::test]
    async fn test_end_session_is_idempotent() {
        let manager = ConversationManager::in_memory(20);
        manager
            .start_conversation("u1", CharacterId::Maria, None)
            .await
            .unwrap();

        manager.end_session("u1").await.unwrap();
        manager.end_session("u1").await.unwrap();
        assert!(manager.get_current_session("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_ends_idle_sessions() {
        let sessions = InMemorySessionStore::new();
        let messages = InMemoryMessageStore::new();
        let manager =
            ConversationManager::new(sessions.clone(), messages.clone(), 20);

        let mut stale = Session::new("u1", CharacterId::Maria, "es");
        stale.start_time = Utc::now() - chrono::Duration::hours(2);
        let stale_id = stale.id;
        sessions.insert(stale).await.unwrap();
        let mut old_message = ConversationMessage::user(stale_id, "hola");
        old_message.timestamp = Utc::now() - chrono::Duration::hours(2);
        messages.append(old_message).await.unwrap();

        manager
            .start_conversation("u2", CharacterId::Chloe, None)
            .await
            .unwrap();

        let ended = manager
            .cleanup_idle(Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(ended, 1);
        assert!(manager.get_current_session("u1").await.unwrap().is_none());
        assert!(manager.get_current_session("u2").await.unwrap().is_some());
        // The idle session's history is dropped with it
        assert!(messages.recent(stale_id, 10).await.unwrap().is_empty());
    }
}
