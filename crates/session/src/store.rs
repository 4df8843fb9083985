//! Session and message storage
//!
//! Trait seams over session records and append-only conversation messages,
//! with in-memory implementations backed by `parking_lot` maps. The traits
//! are async so a database-backed store can slot in without touching the
//! manager.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use parla_core::{ConversationMessage, Session};
use uuid::Uuid;

use crate::SessionError;

/// Storage for session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: Session) -> Result<(), SessionError>;

    async fn get(&self, id: Uuid) -> Result<Option<Session>, SessionError>;

    /// Replace a stored session by id. Missing sessions are an error.
    async fn update(&self, session: Session) -> Result<(), SessionError>;

    /// The user's active session, if any. At most one exists.
    async fn active_for_user(&self, user_id: &str) -> Result<Option<Session>, SessionError>;

    async fn active_sessions(&self) -> Result<Vec<Session>, SessionError>;
}

/// Storage for append-only conversation messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, message: ConversationMessage) -> Result<(), SessionError>;

    /// The most recent `limit` messages of a session, in chronological order.
    async fn recent(
        &self,
        session_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, SessionError>;

    /// Timestamp of the session's newest message, if any.
    async fn last_activity(&self, session_id: Uuid) -> Result<Option<DateTime<Utc>>, SessionError>;

    async fn remove_session(&self, session_id: Uuid) -> Result<(), SessionError>;
}

/// In-memory session store
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: Session) -> Result<(), SessionError> {
        self.sessions.write().insert(session.id, session);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.read().get(&id).cloned())
    }

    async fn update(&self, session: Session) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write();
        if !sessions.contains_key(&session.id) {
            return Err(SessionError::UnknownSession(session.id));
        }
        sessions.insert(session.id, session);
        Ok(())
    }

    async fn active_for_user(&self, user_id: &str) -> Result<Option<Session>, SessionError> {
        Ok(self
            .sessions
            .read()
            .values()
            .find(|s| s.is_active && s.user_id == user_id)
            .cloned())
    }

    async fn active_sessions(&self) -> Result<Vec<Session>, SessionError> {
        Ok(self
            .sessions
            .read()
            .values()
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }
}

/// In-memory message store
#[derive(Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<HashMap<Uuid, Vec<ConversationMessage>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(&self, message: ConversationMessage) -> Result<(), SessionError> {
        self.messages
            .write()
            .entry(message.session_id)
            .or_default()
            .push(message);
        Ok(())
    }

    async fn recent(
        &self,
        session_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, SessionError> {
        let messages = self.messages.read();
        let all = match messages.get(&session_id) {
            Some(all) => all,
            None => return Ok(Vec::new()),
        };
        let start = all.len().saturating_sub(limit);
        Ok(all[start..].to_vec())
    }

    async fn last_activity(&self, session_id: Uuid) -> Result<Option<DateTime<Utc>>, SessionError> {
        Ok(self
            .messages
            .read()
            .get(&session_id)
            .and_then(|all| all.last())
            .map(|m| m.timestamp))
    }

    async fn remove_session(&self, session_id: Uuid) -> Result<(), SessionError> {
        self.messages.write().remove(&session_id);
        Ok(())
    }
}
