//! Service seams the concierge depends on.
//!
//! The production implementations live in `stt`, `tts`, `mcp` and `mint`;
//! tests swap in scripted fakes.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::mcp::ToolDescriptor;
use crate::mint::MintRequest;

/// Service trait for speech-to-text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an uploaded audio file, using the default model when `model` is None
    async fn transcribe(&self, audio: Vec<u8>, model: Option<&str>) -> Result<String>;
}

/// Service trait for text-to-speech
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Write speech for `text` to `destination`; `None` when synthesis is not configured
    async fn synthesize(&self, text: &str, destination: &Path) -> Result<Option<PathBuf>>;
}

/// Service trait for the MCP tool host
#[async_trait]
pub trait ToolHost: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value>;
}

/// Service trait for the server-side mint fallback
#[async_trait]
pub trait MintService: Send + Sync {
    async fn mint(&self, request: &MintRequest) -> Result<Value>;
}
