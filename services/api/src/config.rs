use bargein_core::confidence::{
    ConfidenceClassifier, DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD, UncertainPolicy,
};
use bargein_core::openai_speech::DEFAULT_BASE_URL;
use bargein_core::{CoordinatorConfig, SpeechOptions};
use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub tts_model: String,
    pub stt_model: String,
    pub coordinator: CoordinatorConfig,
    pub echo_replies: bool,
    pub log_level: Level,
}

fn parse<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// This function will look for a `.env` file in the current directory
    /// and load the following variables:
    ///
    /// *   `BIND_ADDRESS`: The address and port to bind the server to. Defaults to "0.0.0.0:3000".
    /// *   `OPENAI_API_KEY`: Secret key for the OpenAI audio endpoints. Required.
    /// *   `OPENAI_BASE_URL`: (Optional) API root. Defaults to the public endpoint.
    /// *   `TTS_MODEL`, `TTS_VOICE`, `TTS_FORMAT`: (Optional) Speech synthesis settings.
    /// *   `STT_MODEL`: (Optional) Transcription model. Defaults to "whisper-1".
    /// *   `CONFIDENCE_LOW`, `CONFIDENCE_HIGH`: (Optional) Classification thresholds.
    /// *   `UNCERTAIN_POLICY`: (Optional) "resume", "interrupt" or "hold". Defaults to "resume".
    /// *   `ECHO_REPLIES`: (Optional) Speak an echo of every accepted user turn. Defaults to true.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_address = parse::<SocketAddr>(
            "BIND_ADDRESS",
            &var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        )?;

        let openai_api_key = var("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;
        let openai_base_url = var("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let tts_model = var("TTS_MODEL").unwrap_or_else(|| "tts-1".to_string());
        let stt_model = var("STT_MODEL").unwrap_or_else(|| "whisper-1".to_string());

        let defaults = SpeechOptions::default();
        let speech_options = SpeechOptions {
            voice: var("TTS_VOICE").unwrap_or(defaults.voice),
            format: var("TTS_FORMAT").unwrap_or(defaults.format),
            speed: defaults.speed,
        };

        let low = match var("CONFIDENCE_LOW") {
            Some(raw) => parse::<f32>("CONFIDENCE_LOW", &raw)?,
            None => DEFAULT_LOW_THRESHOLD,
        };
        let high = match var("CONFIDENCE_HIGH") {
            Some(raw) => parse::<f32>("CONFIDENCE_HIGH", &raw)?,
            None => DEFAULT_HIGH_THRESHOLD,
        };
        let classifier = ConfidenceClassifier::new(low, high).map_err(|e| {
            ConfigError::InvalidValue("CONFIDENCE_LOW/CONFIDENCE_HIGH".to_string(), e.to_string())
        })?;

        let uncertain_policy = match var("UNCERTAIN_POLICY") {
            Some(raw) => parse::<UncertainPolicy>("UNCERTAIN_POLICY", &raw)?,
            None => UncertainPolicy::default(),
        };

        let echo_replies = match var("ECHO_REPLIES") {
            Some(raw) => parse::<bool>("ECHO_REPLIES", &raw)?,
            None => true,
        };

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            openai_api_key,
            openai_base_url,
            tts_model,
            stt_model,
            coordinator: CoordinatorConfig {
                classifier,
                uncertain_policy,
                speech_options,
            },
            echo_replies,
            log_level,
        })
    }
}
