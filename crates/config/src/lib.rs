//! Application settings
//!
//! Layered configuration: `config/default` file, optional per-environment
//! file, then `PARLA__`-prefixed environment variables.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// HTTP/WebSocket server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// External provider configuration
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Turn pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Session management configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.max_message_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.max_message_chars".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.pipeline.history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.history_limit".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.providers.retry_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "providers.retry_max_attempts".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.pipeline.stall_threshold_ms < self.pipeline.stall_check_interval_ms {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.stall_threshold_ms".to_string(),
                message: "must be at least the check interval".to_string(),
            });
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// WebSocket path
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Directory where audio artifacts are written
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,

    /// URL prefix under which audio artifacts are served
    #[serde(default = "default_audio_prefix")]
    pub audio_url_prefix: String,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_ws_path() -> String {
    "/ws/conversation".to_string()
}
fn default_audio_dir() -> String {
    "data/audio".to_string()
}
fn default_audio_prefix() -> String {
    "/audio".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            audio_dir: default_audio_dir(),
            audio_url_prefix: default_audio_prefix(),
            cors_enabled: default_true(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum client messages per second per connection
    #[serde(default = "default_messages_per_second")]
    pub messages_per_second: u32,

    /// Burst allowance (multiple of rate limit)
    #[serde(default = "default_burst_multiplier")]
    pub burst_multiplier: f32,
}

fn default_messages_per_second() -> u32 {
    10
}
fn default_burst_multiplier() -> f32 {
    2.0
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            messages_per_second: default_messages_per_second(),
            burst_multiplier: default_burst_multiplier(),
        }
    }
}

/// External provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Text generation endpoint (OpenAI-compatible chat completions)
    #[serde(default = "default_text_endpoint")]
    pub text_endpoint: String,

    /// Text generation API key
    #[serde(default)]
    pub text_api_key: Option<String>,

    /// Primary model name
    #[serde(default = "default_primary_model")]
    pub primary_model: String,

    /// Fallback model name, used only when the primary fails to start
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,

    /// Primary speech synthesis endpoint
    #[serde(default = "default_speech_endpoint")]
    pub speech_endpoint: String,

    /// Primary speech synthesis API key
    #[serde(default)]
    pub speech_api_key: Option<String>,

    /// Secondary speech synthesis endpoint
    #[serde(default)]
    pub speech_fallback_endpoint: Option<String>,

    /// Secondary speech synthesis API key
    #[serde(default)]
    pub speech_fallback_api_key: Option<String>,

    /// Per-call timeout in milliseconds
    #[serde(default = "default_provider_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum attempts for transient start failures
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Base backoff delay in milliseconds (doubles per attempt)
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_text_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_primary_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_fallback_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_speech_endpoint() -> String {
    "https://api.elevenlabs.io/v1/text-to-speech".to_string()
}
fn default_provider_timeout_ms() -> u64 {
    15_000
}
fn default_retry_max_attempts() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    250
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            text_endpoint: default_text_endpoint(),
            text_api_key: None,
            primary_model: default_primary_model(),
            fallback_model: default_fallback_model(),
            speech_endpoint: default_speech_endpoint(),
            speech_api_key: None,
            speech_fallback_endpoint: None,
            speech_fallback_api_key: None,
            timeout_ms: default_provider_timeout_ms(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

/// Turn pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum accepted user message length in characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// Bounded conversation history window (messages)
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Estimated speech duration per character of text, in milliseconds
    #[serde(default = "default_ms_per_char")]
    pub ms_per_char: u32,

    /// Minimum estimated utterance duration in milliseconds
    #[serde(default = "default_min_duration_ms")]
    pub min_duration_ms: u32,

    /// Interval between stalled-stream checks in milliseconds
    #[serde(default = "default_stall_check_interval_ms")]
    pub stall_check_interval_ms: u64,

    /// Elapsed time without progress considered a stall, in milliseconds
    #[serde(default = "default_stall_threshold_ms")]
    pub stall_threshold_ms: u64,
}

fn default_max_message_chars() -> usize {
    1000
}
fn default_history_limit() -> usize {
    20
}
fn default_ms_per_char() -> u32 {
    80
}
fn default_min_duration_ms() -> u32 {
    500
}
fn default_stall_check_interval_ms() -> u64 {
    2_000
}
fn default_stall_threshold_ms() -> u64 {
    30_000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
            history_limit: default_history_limit(),
            ms_per_char: default_ms_per_char(),
            min_duration_ms: default_min_duration_ms(),
            stall_check_interval_ms: default_stall_check_interval_ms(),
            stall_threshold_ms: default_stall_threshold_ms(),
        }
    }
}

/// Session management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle timeout before a session is ended, in seconds
    #[serde(default = "default_session_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Interval between idle-session cleanup passes, in seconds
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_session_timeout_secs() -> u64 {
    3600
}
fn default_cleanup_interval_secs() -> u64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_session_timeout_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable the /metrics endpoint
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (`PARLA__` prefix, `__` separator)
/// 2. `config/{env}` (if env specified)
/// 3. `config/default`
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{env_name}")).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("PARLA")
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.pipeline.ms_per_char, 80);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_history() {
        let mut settings = Settings::default();
        settings.pipeline.history_limit = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_tight_stall_threshold() {
        let mut settings = Settings::default();
        settings.pipeline.stall_threshold_ms = 1_000;
        assert!(settings.validate().is_err());
    }
}
