//! # Configuration Management
//!
//! Loads the service configuration from multiple sources:
//! - TOML configuration file (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. `OPENAI_API_KEY`, `HOST` and `PORT` environment variables
//! 2. Prefixed environment variables (APP_SERVER__PORT, APP_OPENAI__TTS_VOICE, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! Nested keys use a double underscore so that field names containing a single
//! underscore (`stt_model`, `request_timeout_secs`) still resolve.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration.
///
/// Loaded once at startup and read-only afterwards.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
}

/// Where the HTTP server listens.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Credential and model identifiers for the remote speech/language services.
///
/// ## Fields:
/// - `api_key`: Bearer credential, usually supplied through `OPENAI_API_KEY`
/// - `base_url`: Root of the OpenAI-compatible REST API
/// - `stt_model`: Speech-to-text model (e.g., "whisper-1")
/// - `llm_model`: Chat completion model (e.g., "gpt-4o-mini")
/// - `tts_model`: Text-to-speech model (e.g., "gpt-4o-mini-tts")
/// - `tts_voice`: Voice selector for synthesis (e.g., "alloy")
/// - `request_timeout_secs`: Upper bound on any single outbound call
#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub stt_model: String,
    pub llm_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub request_timeout_secs: u64,
}

// Hand-written so the credential never ends up in a log line.
impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let api_key = if self.api_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("OpenAiConfig")
            .field("api_key", &api_key)
            .field("base_url", &self.base_url)
            .field("stt_model", &self.stt_model)
            .field("llm_model", &self.llm_model)
            .field("tts_model", &self.tts_model)
            .field("tts_voice", &self.tts_voice)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("server", &self.server)
            .field("openai", &self.openai)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            openai: OpenAiConfig {
                api_key: String::new(),
                base_url: "https://api.openai.com/v1".to_string(),
                stt_model: "whisper-1".to_string(),
                llm_model: "gpt-4o-mini".to_string(),
                tts_model: "gpt-4o-mini-tts".to_string(),
                tts_voice: "alloy".to_string(),
                request_timeout_secs: 60,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__HOST=0.0.0.0`: Override server host
    /// - `APP_OPENAI__LLM_MODEL=gpt-4o`: Override the chat model
    /// - `OPENAI_API_KEY=sk-...`: Credential for the remote services
    /// - `HOST` / `PORT`: Special cases for deployment platforms
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            settings = settings.set_override("openai.api_key", key)?;
        }

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - An API key is present
    /// - The base URL looks like an HTTP(S) URL
    /// - Every model/voice identifier is non-empty
    /// - The outbound timeout is at least one second
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        let openai = &self.openai;

        if openai.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "OpenAI API key not configured. Set OPENAI_API_KEY environment variable."
            ));
        }

        if !openai.base_url.starts_with("http://") && !openai.base_url.starts_with("https://") {
            return Err(anyhow::anyhow!("OpenAI base URL must start with http:// or https://"));
        }

        for (name, value) in [
            ("stt_model", &openai.stt_model),
            ("llm_model", &openai.llm_model),
            ("tts_model", &openai.tts_model),
            ("tts_voice", &openai.tts_voice),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow::anyhow!("openai.{} cannot be empty", name));
            }
        }

        if openai.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Request timeout must be greater than 0"));
        }

        Ok(())
    }
}
