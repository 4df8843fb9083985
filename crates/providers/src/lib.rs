//! Provider clients
//!
//! Thin typed wrappers around the external text-generation and
//! speech-synthesis services. All calls are bounded by an explicit timeout;
//! retries happen above these clients through [`retry::Retry`].

pub mod mock;
pub mod retry;
pub mod speech;
pub mod text;

pub use retry::{Retry, RetryPolicy, RetryState};
pub use speech::{ElevenLabsSpeechProvider, OpenAiSpeechProvider, SpeechProvider, SpeechRequest, SpeechResponse, VoiceConfig};
pub use text::{OpenAiTextProvider, TextDelta, TextProvider, TextRequest};

use parla_core::{Categorize, ErrorCategory};

/// Provider call errors
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No credentials configured; callers fall through without retrying
    #[error("provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("provider call timed out after {0} ms")]
    Timeout(u64),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("provider stream failed to start: {0}")]
    StartFailed(String),

    #[error("provider stream interrupted: {0}")]
    Stream(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl Categorize for ProviderError {
    fn category(&self) -> ErrorCategory {
        match self {
            ProviderError::Transport(e) if e.is_connect() => ErrorCategory::ConnectionIssue,
            _ => ErrorCategory::ProviderFailure,
        }
    }
}

impl ProviderError {
    /// Whether retrying the call could plausibly succeed.
    ///
    /// Missing credentials and client-side request errors are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::NotConfigured(_) => false,
            ProviderError::Status(code) => *code >= 500 || *code == 429,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_is_permanent() {
        assert!(!ProviderError::NotConfigured("speech").is_transient());
        assert!(ProviderError::Timeout(1000).is_transient());
        assert!(ProviderError::Status(503).is_transient());
        assert!(!ProviderError::Status(401).is_transient());
    }

    #[test]
    fn test_category_is_provider_failure() {
        assert_eq!(
            ProviderError::Timeout(10).category(),
            ErrorCategory::ProviderFailure
        );
    }
}
