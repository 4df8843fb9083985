//! Turn pipeline
//!
//! The pieces between a validated user message and the enriched response:
//! sentence-chunked streaming generation, audio synthesis with lip-sync
//! timelines, animation state generation, and the deterministic error
//! recovery service. Character voice baselines, emotion tables, gesture
//! tables, and fallback phrasebooks live in [`characters`] as static data.

pub mod animation;
pub mod characters;
pub mod emotion;
pub mod lipsync;
pub mod recovery;
pub mod stream;
pub mod voice;

pub use animation::{AnimationGenerator, Gesture};
pub use characters::CharacterProfile;
pub use emotion::guess_emotion;
pub use recovery::{fallback_response, validate_message, validation_response, FallbackResponse, ValidationError};
pub use stream::{ResponseGenerator, ResponseStream, StreamEvent};
pub use voice::{VoiceSynthesizer, VoiceSynthesizerConfig};

use parla_core::{Categorize, ErrorCategory};
use parla_providers::ProviderError;

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Validation(#[from] recovery::ValidationError),

    #[error("internal channel closed: {0}")]
    Channel(&'static str),
}

impl Categorize for PipelineError {
    fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::Provider(e) => e.category(),
            PipelineError::Validation(_) => ErrorCategory::InputValidation,
            PipelineError::Channel(_) => ErrorCategory::GeneralError,
        }
    }
}
