use secrecy::{ExposeSecret, SecretBox};
use std::env;
use url::Url;

use crate::error::{RelayError, Result};

pub const DEFAULT_API_BASE: &str = "https://staging.crossmint.com/api/2022-06-09";
pub const DEFAULT_PORT: u16 = 9000;

/// Relay settings. The server key is required; without it the relay refuses to start.
#[derive(Debug)]
pub struct RelayConfig {
    server_key: SecretBox<String>,
    pub api_base: Url,
    pub port: u16,
}

impl RelayConfig {
    /// Load configuration from the environment, reading `.env` first if present
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_key = lookup("CROSSMINT_SERVER_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| RelayError::Config("CROSSMINT_SERVER_KEY required in env".into()))?;

        let raw_base = lookup("CROSSMINT_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into());
        let api_base = Url::parse(raw_base.trim()).map_err(|e| {
            RelayError::Config(format!("Invalid CROSSMINT_API_BASE '{}': {}", raw_base, e))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(RelayError::Config(format!(
                "CROSSMINT_API_BASE '{}' cannot be used as a base URL",
                raw_base
            )));
        }

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| RelayError::Config(format!("Invalid PORT '{}'", raw)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            server_key: SecretBox::new(Box::new(server_key)),
            api_base,
            port,
        })
    }

    pub fn new(server_key: impl Into<String>, api_base: Url) -> Self {
        Self {
            server_key: SecretBox::new(Box::new(server_key.into())),
            api_base,
            port: DEFAULT_PORT,
        }
    }

    /// Get the server-side key (use only when making API calls)
    pub fn server_key(&self) -> &str {
        self.server_key.expose_secret()
    }
}
