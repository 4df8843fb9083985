//! Speech synthesis clients
//!
//! Primary ElevenLabs-style client plus an OpenAI-speech-style secondary.
//! Providers report missing credentials as `NotConfigured` so the voice
//! pipeline can fall through to the next link without retrying.

use async_trait::async_trait;
use std::time::Duration;

use crate::ProviderError;

/// Voice parameters, already modulated by character baseline and emotion
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Provider-side voice identifier
    pub voice_id: String,
    /// Speaking rate multiplier (1.0 = neutral)
    pub speed: f32,
    /// Expressiveness in [0, 1]
    pub expressiveness: f32,
    /// Pitch offset in semitones
    pub pitch: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_id: "default".to_string(),
            speed: 1.0,
            expressiveness: 0.5,
            pitch: 0.0,
        }
    }
}

/// A synthesis request
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: VoiceConfig,
}

/// Synthesized audio bytes, plus the measured duration when the provider
/// reports one
#[derive(Debug, Clone)]
pub struct SpeechResponse {
    pub audio: Vec<u8>,
    /// Container format of `audio` ("mp3", "wav")
    pub format: &'static str,
    pub duration_ms: Option<u32>,
}

/// Speech synthesis provider
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechResponse, ProviderError>;

    /// Whether credentials are present; unconfigured providers are skipped
    fn is_configured(&self) -> bool;
}

/// ElevenLabs-style synthesis client
pub struct ElevenLabsSpeechProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ElevenLabsSpeechProvider {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl SpeechProvider for ElevenLabsSpeechProvider {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechResponse, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::NotConfigured("speech"));
        };

        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), request.voice.voice_id);
        let body = serde_json::json!({
            "text": request.text,
            "voice_settings": {
                // Higher expressiveness maps to lower stability
                "stability": (1.0 - request.voice.expressiveness).clamp(0.0, 1.0),
                "style": request.voice.expressiveness,
                "speed": request.voice.speed,
            },
        });

        let send = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .json(&body)
            .send();

        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout.as_millis() as u64))??;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let audio = response.bytes().await?.to_vec();
        Ok(SpeechResponse { audio, format: "mp3", duration_ms: None })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI-speech-style synthesis client (secondary)
pub struct OpenAiSpeechProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenAiSpeechProvider {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl SpeechProvider for OpenAiSpeechProvider {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechResponse, ProviderError> {
        let Some(api_key) = self.api_key.clone() else {
            return Err(ProviderError::NotConfigured("speech_fallback"));
        };

        let body = serde_json::json!({
            "model": "tts-1",
            "input": request.text,
            "voice": request.voice.voice_id,
            "speed": request.voice.speed,
        });

        let send = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send();

        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout.as_millis() as u64))??;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let audio = response.bytes().await?.to_vec();
        Ok(SpeechResponse { audio, format: "mp3", duration_ms: None })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_provider_skips() {
        let provider = ElevenLabsSpeechProvider::new(
            "http://localhost:1/v1/text-to-speech",
            None,
            Duration::from_millis(100),
        );
        assert!(!provider.is_configured());

        let request = SpeechRequest { text: "hola".to_string(), voice: VoiceConfig::default() };
        match provider.synthesize(&request).await {
            Err(ProviderError::NotConfigured(_)) => {}
            other => panic!("expected NotConfigured, got {other:?}"),
        }
    }
}
