//! Core types for the parla conversation pipeline
//!
//! This crate provides foundational types used across all other crates:
//! - Session and conversation types
//! - Audio timeline types (phonemes, visemes)
//! - Animation types
//! - Character and emotion identifiers
//! - Wire events and the error taxonomy

pub mod animation;
pub mod audio;
pub mod character;
pub mod error;
pub mod events;
pub mod session;

pub use animation::{Animation, AnimationCommand, AnimationType, Easing};
pub use audio::{AudioRef, AudioResult, TimedPhoneme, TimedViseme, Viseme};
pub use character::{CharacterId, Emotion, UnknownCharacter};
pub use error::{Categorize, ErrorCategory};
pub use events::{ClientEvent, ServerEvent};
pub use session::{ChatRole, ChatTurn, ConversationMessage, Sender, Session, StreamContext};
