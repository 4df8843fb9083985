//! Audio synthesis with lip-sync timelines
//!
//! Provider chain: primary speech provider → secondary → placeholder tone.
//! Callers always receive a structurally valid `AudioResult` with a
//! non-empty phoneme/viseme timeline; the placeholder path never fails.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use parla_core::{AudioRef, AudioResult, CharacterId, Emotion};
use parla_providers::retry::DelayFn;
use parla_providers::{ProviderError, Retry, RetryPolicy, SpeechProvider, SpeechRequest, SpeechResponse};

use crate::characters::CharacterProfile;
use crate::lipsync;

/// Voice synthesizer configuration
#[derive(Debug, Clone)]
pub struct VoiceSynthesizerConfig {
    /// Directory audio artifacts are written to
    pub artifact_dir: PathBuf,
    /// URL prefix under which artifacts are served
    pub url_prefix: String,
    /// Estimated speech duration per character of text
    pub ms_per_char: u32,
    /// Minimum estimated utterance duration
    pub min_duration_ms: u32,
    pub retry_policy: RetryPolicy,
}

impl Default for VoiceSynthesizerConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("data/audio"),
            url_prefix: "/audio".to_string(),
            ms_per_char: 80,
            min_duration_ms: 500,
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// Audio synthesis & lip-sync generator
pub struct VoiceSynthesizer {
    primary: Arc<dyn SpeechProvider>,
    secondary: Option<Arc<dyn SpeechProvider>>,
    config: VoiceSynthesizerConfig,
    delay: Option<DelayFn>,
}

impl VoiceSynthesizer {
    pub fn new(
        primary: Arc<dyn SpeechProvider>,
        secondary: Option<Arc<dyn SpeechProvider>>,
        config: VoiceSynthesizerConfig,
    ) -> Self {
        Self { primary, secondary, config, delay: None }
    }

    /// Inject a delay function for tests
    pub fn with_delay(mut self, delay: DelayFn) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fixed per-character-of-text estimate with a minimum floor
    pub fn estimate_duration_ms(&self, text: &str) -> u32 {
        let chars = text.chars().count() as u32;
        (chars * self.config.ms_per_char).max(self.config.min_duration_ms)
    }

    /// Synthesize speech for the final response text.
    ///
    /// Never fails: when both providers are down or unconfigured, a
    /// deterministic placeholder tone of the estimated duration stands in.
    pub async fn synthesize(
        &self,
        text: &str,
        character_id: CharacterId,
        emotion: Option<Emotion>,
    ) -> AudioResult {
        let profile = CharacterProfile::of(character_id);
        let request = SpeechRequest {
            text: text.to_string(),
            voice: profile.voice_config(emotion),
        };
        let estimate_ms = self.estimate_duration_ms(text);

        match self.try_providers(&request).await {
            Ok(response) => {
                let duration_ms = response.duration_ms.unwrap_or(estimate_ms);
                let audio = self.store_artifact(response.audio, response.format).await;
                let (phonemes, visemes) = lipsync::build_timeline(text, duration_ms);
                AudioResult { audio, duration_ms, phonemes, visemes }
            }
            Err(err) => {
                tracing::warn!(error = %err, "speech synthesis degraded to placeholder audio");
                self.placeholder(text, estimate_ms).await
            }
        }
    }

    async fn try_providers(&self, request: &SpeechRequest) -> Result<SpeechResponse, ProviderError> {
        match self.call_with_retry(self.primary.as_ref(), request).await {
            Ok(response) => Ok(response),
            Err(primary_err) => match &self.secondary {
                Some(secondary) => {
                    tracing::debug!(error = %primary_err, "primary speech provider failed");
                    self.call_with_retry(secondary.as_ref(), request).await
                }
                None => Err(primary_err),
            },
        }
    }

    async fn call_with_retry(
        &self,
        provider: &dyn SpeechProvider,
        request: &SpeechRequest,
    ) -> Result<SpeechResponse, ProviderError> {
        if !provider.is_configured() {
            return Err(ProviderError::NotConfigured("speech"));
        }

        let mut retry = match &self.delay {
            Some(delay) => Retry::with_delay(self.config.retry_policy, delay.clone()),
            None => Retry::new(self.config.retry_policy),
        };
        retry
            .run(|| provider.synthesize(request), ProviderError::is_transient)
            .await
    }

    /// Write audio bytes under the artifact dir; fall back to an in-memory
    /// buffer if the write fails so the caller still gets a valid result.
    async fn store_artifact(&self, bytes: Vec<u8>, format: &str) -> AudioRef {
        let filename = format!("{}.{format}", uuid::Uuid::new_v4());
        let path = self.config.artifact_dir.join(&filename);

        if let Err(e) = tokio::fs::create_dir_all(&self.config.artifact_dir).await {
            tracing::warn!(error = %e, "failed to create audio artifact dir");
            return AudioRef::Buffer(bytes);
        }
        match tokio::fs::write(&path, &bytes).await {
            Ok(()) => AudioRef::Url(format!(
                "{}/{filename}",
                self.config.url_prefix.trim_end_matches('/')
            )),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "failed to write audio artifact");
                AudioRef::Buffer(bytes)
            }
        }
    }

    /// Deterministic placeholder: a quiet tone of the estimated duration.
    async fn placeholder(&self, text: &str, duration_ms: u32) -> AudioResult {
        let bytes = placeholder_wav(duration_ms);
        let audio = self.store_artifact(bytes, "wav").await;
        let (phonemes, visemes) = lipsync::build_timeline(text, duration_ms);
        AudioResult { audio, duration_ms, phonemes, visemes }
    }
}

/// Render a 220 Hz sine tone WAV of the given duration.
fn placeholder_wav(duration_ms: u32) -> Vec<u8> {
    const SAMPLE_RATE: u32 = 16_000;
    const FREQ: f32 = 220.0;
    const AMPLITUDE: f32 = 0.1;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let samples = (SAMPLE_RATE as u64 * duration_ms as u64 / 1000) as u32;
    let mut cursor = Cursor::new(Vec::new());
    {
        let Ok(mut writer) = hound::WavWriter::new(&mut cursor, spec) else {
            return Vec::new();
        };
        for n in 0..samples {
            let t = n as f32 / SAMPLE_RATE as f32;
            let value = (t * FREQ * 2.0 * std::f32::consts::PI).sin() * AMPLITUDE;
            if writer.write_sample((value * i16::MAX as f32) as i16).is_err() {
                break;
            }
        }
        let _ = writer.finalize();
    }
    cursor.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parla_providers::mock::MockSpeechProvider;

    fn test_config(dir: &str) -> VoiceSynthesizerConfig {
        VoiceSynthesizerConfig {
            artifact_dir: std::env::temp_dir().join(dir),
            ..Default::default()
        }
    }

    #[test]
    fn test_duration_estimate_floor() {
        let synth = VoiceSynthesizer::new(
            Arc::new(MockSpeechProvider::new(None)),
            None,
            test_config("parla-test-estimate"),
        );
        assert_eq!(synth.estimate_duration_ms("ab"), 500);
        assert_eq!(synth.estimate_duration_ms(&"x".repeat(100)), 8000);
    }

    #[tokio::test]
    async fn test_provider_duration_preferred_over_estimate() {
        let synth = VoiceSynthesizer::new(
            Arc::new(MockSpeechProvider::new(Some(1234))),
            None,
            test_config("parla-test-duration"),
        );
        let result = synth.synthesize("hola amigo", CharacterId::Maria, None).await;
        assert_eq!(result.duration_ms, 1234);
        assert!(result.is_well_formed());
    }

    #[tokio::test]
    async fn test_secondary_provider_used_on_failure() {
        let secondary = Arc::new(MockSpeechProvider::new(Some(900)));
        let secondary_calls = secondary.calls.clone();
        let synth = VoiceSynthesizer::new(
            Arc::new(MockSpeechProvider::new(None).unconfigured()),
            Some(secondary),
            test_config("parla-test-secondary"),
        );

        let result = synth.synthesize("bonjour", CharacterId::Chloe, None).await;
        assert_eq!(result.duration_ms, 900);
        assert_eq!(secondary_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_placeholder_when_all_providers_fail() {
        let synth = VoiceSynthesizer::new(
            Arc::new(MockSpeechProvider::new(None).failing()),
            Some(Arc::new(MockSpeechProvider::new(None).unconfigured())),
            test_config("parla-test-placeholder"),
        )
        .with_delay(Arc::new(|_| Box::pin(async {})));

        let result = synth
            .synthesize("hola", CharacterId::Maria, Some(Emotion::Happy))
            .await;

        // Estimated: 4 chars * 80ms < 500ms floor
        assert_eq!(result.duration_ms, 500);
        assert!(!result.visemes.is_empty());
        assert!(result.is_well_formed());
    }

    #[test]
    fn test_placeholder_wav_length_scales() {
        let short = placeholder_wav(500);
        let long = placeholder_wav(1000);
        assert!(long.len() > short.len());
        // RIFF header
        assert_eq!(&short[..4], b"RIFF");
    }
}
