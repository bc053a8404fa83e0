use secrecy::{ExposeSecret, SecretBox};
use std::env;
use thiserror::Error;
use url::Url;

pub const DEFAULT_MCP_URL: &str = "http://localhost:8000/mcp";
pub const DEFAULT_MINT_RELAY_URL: &str = "http://localhost:9000";
/// Placeholder voice id shipped in sample `.env` files; treated as unset.
pub const VOICE_PLACEHOLDER: &str = "voice_id_here";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL in {var}: {reason}")]
    InvalidUrl { var: String, reason: String },
}

/// Endpoints and credentials used by the concierge front-end.
///
/// Every vendor credential is optional here: a missing key only disables the
/// feature that needs it, and the failure is reported when that feature runs.
#[derive(Debug)]
pub struct ApiConfig {
    pub mcp_url: Url,
    pub mcp_token: Option<SecretBox<String>>,
    pub aimlapi_key: Option<SecretBox<String>>,
    pub elevenlabs_key: Option<SecretBox<String>>,
    pub elevenlabs_voice: Option<String>,
    pub mint_relay_url: Url,
}

impl ApiConfig {
    /// Load configuration from the environment, reading `.env` first if present
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mcp_url = parse_url(
            "CORAL_SERVER_URL",
            lookup("CORAL_SERVER_URL").as_deref().unwrap_or(DEFAULT_MCP_URL),
        )?;
        let mint_relay_url = parse_url(
            "CROSSMINT_SERVER_URL",
            lookup("CROSSMINT_SERVER_URL")
                .as_deref()
                .unwrap_or(DEFAULT_MINT_RELAY_URL),
        )?;

        let elevenlabs_voice = lookup("ELEVENLABS_VOICE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != VOICE_PLACEHOLDER);

        Ok(Self {
            mcp_url,
            mcp_token: optional_secret(lookup("CORAL_SERVER_TOKEN")),
            aimlapi_key: optional_secret(lookup("AIMLAPI_KEY")),
            elevenlabs_key: optional_secret(lookup("ELEVENLABS_API_KEY")),
            elevenlabs_voice,
            mint_relay_url,
        })
    }

    /// Bearer token for the MCP host (use only when making API calls)
    pub fn mcp_token(&self) -> Option<&str> {
        self.mcp_token.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// Get AIML API key (use only when making API calls)
    pub fn aimlapi_key(&self) -> Option<&str> {
        self.aimlapi_key.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// Get ElevenLabs API key (use only when making API calls)
    pub fn elevenlabs_key(&self) -> Option<&str> {
        self.elevenlabs_key
            .as_ref()
            .map(|s| s.expose_secret().as_str())
    }

    /// Log which optional integrations are unavailable
    pub fn report_missing(&self) {
        if self.aimlapi_key.is_none() {
            log::warn!("⚠️ AIMLAPI_KEY not set: audio transcription disabled, typed input only");
        }
        if self.elevenlabs_key.is_none() || self.elevenlabs_voice.is_none() {
            log::warn!(
                "⚠️ ElevenLabs not configured (ELEVENLABS_API_KEY or ELEVENLABS_VOICE missing)"
            );
        }
    }
}

fn optional_secret(value: Option<String>) -> Option<SecretBox<String>> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| SecretBox::new(Box::new(v)))
}

pub(crate) fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
        var: var.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidUrl {
            var: var.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Load configuration with helpful error messages for development
pub fn load_config() -> Result<ApiConfig, ConfigError> {
    match ApiConfig::load() {
        Ok(config) => {
            log::info!("Successfully loaded API configuration");
            config.report_missing();
            Ok(config)
        }
        Err(e) => {
            log::error!("Configuration error: {}", e);
            log::error!("Check CORAL_SERVER_URL and CROSSMINT_SERVER_URL in your .env file");
            Err(e)
        }
    }
}
