//! Application Configuration Module
//!
//! This module centralizes the configuration for the Roadie service.
//! It loads settings from environment variables and provides a single,
//! shareable struct that can be passed throughout the application.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use tracing::Level;

const DEFAULT_CHAT_MODEL: &str = "@cf/meta/llama-2-7b-chat-int8";
const DEFAULT_TRANSCRIPTION_MODEL: &str = "@cf/openai/whisper-tiny-en";
const DEFAULT_TRANSCRIBE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_GENERATE_TIMEOUT_SECS: u64 = 60;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub cf_account_id: String,
    pub cf_api_token: SecretString,
    pub chat_model: String,
    pub transcription_model: String,
    pub google_access_token: SecretString,
    pub google_calendar_id: String,
    pub transcribe_timeout: Duration,
    pub generate_timeout: Duration,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid whole-second duration provided for {0}: {1}")]
    InvalidDuration(String, String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `BIND_ADDR`: (Optional) Address to listen on. Defaults to "0.0.0.0:8787".
    // *   `DATA_DIR`: (Optional) Directory holding the per-user databases. Defaults to "./data".
    // *   `CF_ACCOUNT_ID`: Cloudflare account id for Workers AI. Required.
    // *   `CF_API_TOKEN`: API token with Workers AI access. Required.
    // *   `CHAT_MODEL`: (Optional) Text generation model.
    // *   `TRANSCRIPTION_MODEL`: (Optional) Speech-to-text model.
    // *   `GOOGLE_ACCESS_TOKEN`: OAuth access token for the band calendar. Required.
    // *   `GOOGLE_CALENDAR_ID`: (Optional) Calendar to book into. Defaults to "primary".
    // *   `TRANSCRIBE_TIMEOUT_SECS`: (Optional) Deadline for one transcription call. Defaults to 30.
    // *   `GENERATE_TIMEOUT_SECS`: (Optional) Deadline for one reply generation. Defaults to 60.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8787".to_string());
        let data_dir = env::var("DATA_DIR")
            .unwrap_or_else(|_| "./data".to_string())
            .into();

        let cf_account_id = require("CF_ACCOUNT_ID")?;
        let cf_api_token = SecretString::from(require("CF_API_TOKEN")?);
        let chat_model =
            env::var("CHAT_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string());
        let transcription_model = env::var("TRANSCRIPTION_MODEL")
            .unwrap_or_else(|_| DEFAULT_TRANSCRIPTION_MODEL.to_string());

        let google_access_token = SecretString::from(require("GOOGLE_ACCESS_TOKEN")?);
        let google_calendar_id =
            env::var("GOOGLE_CALENDAR_ID").unwrap_or_else(|_| "primary".to_string());

        let transcribe_timeout =
            duration_secs("TRANSCRIBE_TIMEOUT_SECS", DEFAULT_TRANSCRIBE_TIMEOUT_SECS)?;
        let generate_timeout =
            duration_secs("GENERATE_TIMEOUT_SECS", DEFAULT_GENERATE_TIMEOUT_SECS)?;

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            bind_addr,
            data_dir,
            cf_account_id,
            cf_api_token,
            chat_model,
            transcription_model,
            google_access_token,
            google_calendar_id,
            transcribe_timeout,
            generate_timeout,
            log_level,
        })
    }
}

fn require(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn duration_secs(name: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidDuration(name.to_string(), raw)),
        Err(_) => Ok(Duration::from_secs(default_secs)),
    }
}
