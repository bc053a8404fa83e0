use crate::error::{ConciergeError, Result};
use crate::services::SpeechSynthesizer;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct TTSConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for TTSConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io/v1".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

pub struct ElevenLabsTTS {
    client: Client,
    api_key: Option<String>,
    voice_id: Option<String>,
    config: TTSConfig,
}

impl ElevenLabsTTS {
    pub fn new(api_key: Option<String>, voice_id: Option<String>) -> Result<Self> {
        Self::with_config(api_key, voice_id, TTSConfig::default())
    }

    pub fn with_config(
        api_key: Option<String>,
        voice_id: Option<String>,
        config: TTSConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConciergeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            voice_id,
            config,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.voice_id.is_some()
    }

    /// Stream synthesized speech for `text` into `destination`.
    ///
    /// Returns `Ok(None)` without touching the network when the key or voice
    /// is not configured; speech output is optional.
    pub async fn synthesize_to_file(
        &self,
        text: &str,
        destination: &Path,
    ) -> Result<Option<PathBuf>> {
        let (api_key, voice_id) = match (&self.api_key, &self.voice_id) {
            (Some(key), Some(voice)) => (key, voice),
            _ => {
                log::warn!(
                    "⚠️ ElevenLabs not configured (ELEVENLABS_API_KEY or ELEVENLABS_VOICE missing)"
                );
                return Ok(None);
            }
        };

        let url = format!(
            "{}/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            voice_id
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("❌ ElevenLabs TTS error: {} {}", status.as_u16(), error_text);
            return Err(ConciergeError::Http {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        log::info!(
            "🔊 Wrote {} bytes of speech to {}",
            written,
            destination.display()
        );

        Ok(Some(destination.to_path_buf()))
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsTTS {
    async fn synthesize(&self, text: &str, destination: &Path) -> Result<Option<PathBuf>> {
        self.synthesize_to_file(text, destination).await
    }
}
