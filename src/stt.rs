use crate::error::{ConciergeError, Result};
use crate::services::Transcriber;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};

pub const DEFAULT_STT_MODEL: &str = "openai/whisper-large";

/// Job states reported once a transcription has finished successfully.
const TERMINAL_SUCCESS: [&str; 3] = ["succeeded", "completed", "done"];

#[derive(Debug, Clone)]
pub struct STTConfig {
    pub base_url: String,
    pub model: String,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for STTConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.aimlapi.com/v1".to_string(),
            model: DEFAULT_STT_MODEL.to_string(),
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Client for the AIML API speech-to-text job endpoints.
///
/// A transcription is a two-step job: upload the audio to `/stt/create`, then
/// poll `/stt/{id}` until the job reports a terminal status.
pub struct AimlSTT {
    client: Client,
    api_key: Option<String>,
    config: STTConfig,
}

impl AimlSTT {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_config(api_key, STTConfig::default())
    }

    pub fn with_config(api_key: Option<String>, config: STTConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConciergeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    pub fn config(&self) -> &STTConfig {
        &self.config
    }

    /// Upload audio and block until the transcript is ready or `timeout` elapses.
    pub async fn transcribe_bytes(
        &self,
        audio: Vec<u8>,
        model: &str,
        timeout: Duration,
    ) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ConciergeError::Config("AIMLAPI_KEY missing in environment".into()))?;

        let job_id = self.create_job(api_key, audio, model).await?;
        log::info!("🎤 STT job {} created (model {})", job_id, model);

        let status_url = format!("{}/stt/{}", self.base_url(), job_id);
        let started = Instant::now();
        let mut polls = 0u32;

        loop {
            polls += 1;
            let body = self.get_json(&status_url, api_key).await?;
            let status = body.get("status").and_then(Value::as_str).unwrap_or("");

            if TERMINAL_SUCCESS.contains(&status) {
                let text = extract_transcript(&body);
                log::info!(
                    "✅ STT job {} finished after {} polls: '{}'",
                    job_id,
                    polls,
                    text
                );
                return Ok(text);
            }

            log::debug!("STT job {} status '{}' (poll {})", job_id, status, polls);

            if started.elapsed() > timeout {
                log::warn!("⏱️ STT job {} timed out after {:?}", job_id, timeout);
                return Err(ConciergeError::Timeout(format!(
                    "STT poll timed out after {:?}",
                    timeout
                )));
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn create_job(&self, api_key: &str, audio: Vec<u8>, model: &str) -> Result<String> {
        let url = format!("{}/stt/create", self.base_url());
        let file = Part::bytes(audio)
            .file_name("audio.wav")
            .mime_str("audio/wav")?;
        let form = Form::new()
            .part("file", file)
            .text("model", model.to_string());

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ConciergeError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let json: Value = serde_json::from_str(&text)
            .map_err(|e| ConciergeError::Transport(format!("Invalid JSON from STT create: {}", e)))?;

        job_id(&json).ok_or_else(|| {
            ConciergeError::Transport(format!("No generation id returned from AIMLAPI: {}", text))
        })
    }

    async fn get_json(&self, url: &str, api_key: &str) -> Result<Value> {
        let response = self.client.get(url).bearer_auth(api_key).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ConciergeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ConciergeError::Transport(format!("Invalid JSON from STT status: {}", e)))
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }
}

#[async_trait]
impl Transcriber for AimlSTT {
    async fn transcribe(&self, audio: Vec<u8>, model: Option<&str>) -> Result<String> {
        let model = model.unwrap_or(self.config.model.as_str());
        self.transcribe_bytes(audio, model, self.config.timeout)
            .await
    }
}

/// Job id from the create response: `generation_id`, falling back to `id`.
fn job_id(body: &Value) -> Option<String> {
    ["generation_id", "id"].iter().find_map(|key| match body.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Transcript text in priority order: `text`, `transcript`, `result.text`.
fn extract_transcript(body: &Value) -> String {
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    non_empty(body.get("text"))
        .or_else(|| non_empty(body.get("transcript")))
        .or_else(|| non_empty(body.get("result").and_then(|r| r.get("text"))))
        .unwrap_or_default()
}
