//! Error recovery service
//!
//! Input validation, error categorization, and deterministic per-character
//! fallback responses. No randomness anywhere: a given (category, character)
//! pair always yields the same text and animation, so responses are directly
//! assertable in tests. Raw provider error text never reaches the client.

use parla_core::{Animation, CharacterId, Emotion, ErrorCategory};

use crate::animation::AnimationGenerator;
use crate::characters::CharacterProfile;

/// Intensity used for fallback animations; fixed for determinism
const FALLBACK_INTENSITY: f32 = 0.6;

/// Validation failures, handled locally without any provider call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("message is empty")]
    Empty,

    #[error("message length {len} exceeds maximum {max}")]
    TooLong { len: usize, max: usize },
}

/// Reject empty/whitespace-only text and text over the maximum length.
pub fn validate_message(text: &str, max_chars: usize) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    let len = text.chars().count();
    if len > max_chars {
        return Err(ValidationError::TooLong { len, max: max_chars });
    }
    Ok(())
}

/// A character-voiced recovery payload
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackResponse {
    pub text: String,
    pub emotion: Emotion,
    pub animation: Animation,
}

/// Character-voiced reply to a validation failure.
///
/// Not a "failure" from the client's perspective: it is delivered as a
/// normal response, localized to the character's language.
pub fn validation_response(error: &ValidationError, character_id: CharacterId) -> FallbackResponse {
    let profile = CharacterProfile::of(character_id);
    let text = match error {
        ValidationError::Empty => profile.empty_message_line(),
        ValidationError::TooLong { .. } => profile.too_long_line(),
    };

    FallbackResponse {
        text: text.to_string(),
        emotion: Emotion::Surprised,
        animation: AnimationGenerator::new().emotion_animation(
            character_id,
            Emotion::Surprised,
            FALLBACK_INTENSITY,
        ),
    }
}

/// Deterministic fallback for provider/connection/general failures.
pub fn fallback_response(category: ErrorCategory, character_id: CharacterId) -> FallbackResponse {
    let profile = CharacterProfile::of(character_id);

    FallbackResponse {
        text: profile.fallback_line(category).to_string(),
        emotion: Emotion::Encouraging,
        animation: AnimationGenerator::new().emotion_animation(
            character_id,
            Emotion::Encouraging,
            FALLBACK_INTENSITY,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_whitespace_only() {
        assert_eq!(validate_message("   ", 1000), Err(ValidationError::Empty));
        assert_eq!(validate_message("", 1000), Err(ValidationError::Empty));
        assert!(validate_message("Hola", 1000).is_ok());
    }

    #[test]
    fn test_validate_rejects_over_long() {
        let long = "x".repeat(1001);
        assert_eq!(
            validate_message(&long, 1000),
            Err(ValidationError::TooLong { len: 1001, max: 1000 })
        );
    }

    #[test]
    fn test_fallback_is_deterministic() {
        for category in ErrorCategory::ALL {
            for id in CharacterId::ALL {
                let first = fallback_response(category, id);
                let second = fallback_response(category, id);
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn test_fallback_animation_is_encouraging() {
        let response = fallback_response(ErrorCategory::ProviderFailure, CharacterId::Maria);
        assert_eq!(response.emotion, Emotion::Encouraging);
        assert!(!response.animation.commands.is_empty());
        assert!(!response.text.is_empty());
    }

    #[test]
    fn test_validation_response_localized() {
        let empty = ValidationError::Empty;
        let maria = validation_response(&empty, CharacterId::Maria);
        let akira = validation_response(&empty, CharacterId::Akira);
        assert_ne!(maria.text, akira.text);
    }
}
