//! Session management
//!
//! Session lifecycle (create, switch, end), append-only conversation history
//! with a bounded provider-facing window, and idle-session cleanup. Storage
//! sits behind [`store::SessionStore`] and [`store::MessageStore`]; the
//! in-memory implementations are the defaults and the test doubles.

pub mod manager;
pub mod store;

pub use manager::{run_cleanup, ConversationManager};
pub use store::{InMemoryMessageStore, InMemorySessionStore, MessageStore, SessionStore};

use uuid::Uuid;

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no active session for user {0}")]
    NotFound(String),

    #[error("session {0} not found")]
    UnknownSession(Uuid),

    #[error("session store error: {0}")]
    Store(String),
}
