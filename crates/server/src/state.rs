//! Application state
//!
//! Shared handles built once from settings and cloned into every handler.

use std::sync::Arc;
use std::time::Duration;

use parla_config::Settings;
use parla_pipeline::{ResponseGenerator, VoiceSynthesizer, VoiceSynthesizerConfig};
use parla_providers::{
    ElevenLabsSpeechProvider, OpenAiSpeechProvider, OpenAiTextProvider, RetryPolicy,
    SpeechProvider,
};
use parla_session::ConversationManager;

use crate::health::HealthMonitor;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub manager: Arc<ConversationManager>,
    pub generator: Arc<ResponseGenerator>,
    pub synthesizer: Arc<VoiceSynthesizer>,
    pub health: Arc<HealthMonitor>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let providers = &settings.providers;
        let timeout = Duration::from_millis(providers.timeout_ms);
        let retry_policy = RetryPolicy {
            max_attempts: providers.retry_max_attempts,
            base_delay: Duration::from_millis(providers.retry_base_delay_ms),
        };

        let text_provider = Arc::new(OpenAiTextProvider::new(
            &providers.text_endpoint,
            providers.text_api_key.clone(),
            timeout,
        ));
        let generator = Arc::new(ResponseGenerator::new(
            text_provider,
            &providers.primary_model,
            &providers.fallback_model,
            retry_policy,
        ));

        let primary_speech = Arc::new(ElevenLabsSpeechProvider::new(
            &providers.speech_endpoint,
            providers.speech_api_key.clone(),
            timeout,
        ));
        let secondary_speech: Option<Arc<dyn SpeechProvider>> =
            providers.speech_fallback_endpoint.as_ref().map(|endpoint| {
                Arc::new(OpenAiSpeechProvider::new(
                    endpoint,
                    providers.speech_fallback_api_key.clone(),
                    timeout,
                )) as Arc<dyn SpeechProvider>
            });
        let synthesizer = Arc::new(VoiceSynthesizer::new(
            primary_speech,
            secondary_speech,
            VoiceSynthesizerConfig {
                artifact_dir: settings.server.audio_dir.clone().into(),
                url_prefix: settings.server.audio_url_prefix.clone(),
                ms_per_char: settings.pipeline.ms_per_char,
                min_duration_ms: settings.pipeline.min_duration_ms,
                retry_policy,
            },
        ));

        let manager = Arc::new(ConversationManager::in_memory(settings.pipeline.history_limit));

        Self {
            settings: Arc::new(settings),
            manager,
            generator,
            synthesizer,
            health: Arc::new(HealthMonitor::new()),
        }
    }
}
