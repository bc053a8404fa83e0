//! The concierge flow: capture, discover, dispatch, classify, then render or
//! speak, with an optional checkout that falls back to the mint relay.

pub mod request;
pub mod state;

pub use request::{
    validate_mint_qty, Chain, InvocationRequest, NftQueryForm, LIMIT_RANGE, MINT_QTY_RANGE,
};
pub use state::{FlowState, SessionContext, ToolSelection};

use serde_json::{json, Map, Value};
use std::path::PathBuf;

use crate::classifier::{normalize, AgentReply, StructuredAnalysis};
use crate::config::ApiConfig;
use crate::error::{ConciergeError, Result};
use crate::mcp::{McpClient, ToolDescriptor, AGENT_TRANSACTION};
use crate::mint::{CheckoutRequest, MintRelayClient, MintRequest};
use crate::services::{MintService, SpeechSynthesizer, ToolHost, Transcriber};
use crate::stt::AimlSTT;
use crate::tts::ElevenLabsTTS;

pub const CHECKOUT_SOURCE: &str = "nova-concierge";
const SPEECH_FILE: &str = "nova_tts.mp3";

/// Result of sending a request to an agent.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// Structured analysis received; kept for checkout.
    Rendered {
        request: InvocationRequest,
        raw: Value,
        analysis: StructuredAnalysis,
    },
    /// Text answer, spoken when synthesis is available.
    Spoken {
        request: InvocationRequest,
        raw: Value,
        text: String,
        audio: Option<PathBuf>,
    },
}

/// How a checkout request was resolved.
#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    CheckoutUrl {
        request: CheckoutRequest,
        url: String,
    },
    Minted {
        request: MintRequest,
        response: Value,
    },
}

pub struct Concierge {
    transcriber: Box<dyn Transcriber>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    tools: Box<dyn ToolHost>,
    mint: Box<dyn MintService>,
    speech_path: PathBuf,
    state: FlowState,
    context: SessionContext,
}

impl Concierge {
    pub fn new(
        transcriber: impl Transcriber + 'static,
        synthesizer: impl SpeechSynthesizer + 'static,
        tools: impl ToolHost + 'static,
        mint: impl MintService + 'static,
    ) -> Self {
        Self {
            transcriber: Box::new(transcriber),
            synthesizer: Box::new(synthesizer),
            tools: Box::new(tools),
            mint: Box::new(mint),
            speech_path: std::env::temp_dir().join(SPEECH_FILE),
            state: FlowState::Idle,
            context: SessionContext::default(),
        }
    }

    /// Wire the production clients from configuration.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let transcriber = AimlSTT::new(config.aimlapi_key().map(str::to_string))?;
        let synthesizer = ElevenLabsTTS::new(
            config.elevenlabs_key().map(str::to_string),
            config.elevenlabs_voice.clone(),
        )?;
        let tools = McpClient::new(
            config.mcp_url.as_str(),
            config.mcp_token().map(str::to_string),
        );
        let mint = MintRelayClient::new(config.mint_relay_url.as_str())?;

        Ok(Self::new(transcriber, synthesizer, tools, mint))
    }

    pub fn with_speech_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.speech_path = path.into();
        self
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn form_mut(&mut self) -> &mut NftQueryForm {
        &mut self.context.form
    }

    fn transition(&mut self, next: FlowState) {
        if self.state != next {
            log::debug!("Flow state {} -> {}", self.state, next);
            self.state = next;
        }
    }

    /// Use typed text as the transcript.
    pub fn capture_text(&mut self, text: &str) -> Result<&str> {
        let text = text.trim();
        if text.is_empty() {
            log::warn!("⚠️ No audio or typed text provided");
            return Err(ConciergeError::InvalidInput(
                "No audio or typed text provided".into(),
            ));
        }
        Ok(self.store_transcript(text.to_string()))
    }

    /// Transcribe uploaded audio and use the result as the transcript.
    pub async fn capture_audio(&mut self, audio: Vec<u8>, model: Option<&str>) -> Result<&str> {
        if audio.is_empty() {
            return Err(ConciergeError::InvalidInput("Audio file is empty".into()));
        }

        log::info!("🎤 Transcribing {} bytes of audio", audio.len());
        let transcript = self.transcriber.transcribe(audio, model).await?;
        let transcript = transcript.trim();
        if transcript.is_empty() {
            log::warn!("⚠️ Transcription returned no text");
            return Err(ConciergeError::InvalidInput(
                "Transcription returned no text".into(),
            ));
        }
        Ok(self.store_transcript(transcript.to_string()))
    }

    fn store_transcript(&mut self, transcript: String) -> &str {
        log::info!("📝 Transcript: '{}'", transcript);
        self.transition(FlowState::Captured);
        self.context.transcript.insert(transcript).as_str()
    }

    /// Ask the tool host for its registry.
    pub async fn discover(&mut self) -> Result<&[ToolDescriptor]> {
        let previous = self.state;
        self.transition(FlowState::Discovering);

        match self.tools.list_tools().await {
            Ok(tools) => {
                self.context.tools = tools;
                if !self.context.selection.name().is_some_and(|name| {
                    self.context.tools.iter().any(|tool| tool.name == name)
                }) {
                    self.context.selection = ToolSelection::Manual;
                }
                self.transition(FlowState::ToolsListed);
                Ok(self.context.tools.as_slice())
            }
            Err(e) => {
                log::error!("❌ Failed to list tools: {}", e);
                self.transition(previous);
                Err(e)
            }
        }
    }

    /// Choose the target agent; `None` or `"manual"` means free text to the analyst.
    pub fn select_tool(&mut self, name: Option<&str>) -> Result<&ToolSelection> {
        let selection = match name.map(str::trim) {
            None | Some("") | Some("manual") | Some("manual input") => ToolSelection::Manual,
            Some(name) => {
                if !self.context.tools.iter().any(|tool| tool.name == name) {
                    return Err(ConciergeError::InvalidInput(format!(
                        "Unknown agent '{}'; available: {}",
                        name,
                        self.context.tool_names().join(", ")
                    )));
                }
                ToolSelection::Tool(name.to_string())
            }
        };

        self.context.selection = selection;
        Ok(&self.context.selection)
    }

    /// Build the invocation for the current selection without sending it.
    pub fn build_request(&self) -> Result<InvocationRequest> {
        if self.context.selection.uses_structured_form() {
            return InvocationRequest::structured(&self.context.form);
        }

        let transcript = self
            .context
            .transcript
            .as_deref()
            .ok_or_else(|| ConciergeError::InvalidInput("No transcript available".into()))?;
        Ok(InvocationRequest::unstructured(
            self.context.selection.name(),
            transcript,
        ))
    }

    /// Send the request to the selected agent and act on the reply.
    pub async fn dispatch(&mut self) -> Result<DispatchOutcome> {
        let request = self.build_request()?;
        let previous = self.state;
        self.transition(FlowState::Dispatching);

        log::info!(
            "🤖 Calling {} with {}",
            request.target_tool,
            request.arguments_value()
        );
        let raw = match self
            .tools
            .call_tool(&request.target_tool, request.arguments_value())
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("❌ Agent call failed: {}", e);
                self.transition(previous);
                return Err(e);
            }
        };
        self.transition(FlowState::ResponseReceived);

        match normalize(&raw) {
            AgentReply::Structured(analysis) => {
                log::info!(
                    "📊 Structured analysis received: {} rarity scores, {} floor points",
                    analysis.rarity_scores.len(),
                    analysis.floor_history.len()
                );
                self.context.last_analysis = Some(analysis.clone());
                self.transition(FlowState::Rendered);
                Ok(DispatchOutcome::Rendered {
                    request,
                    raw,
                    analysis,
                })
            }
            AgentReply::Text(text) => {
                // A text reply supersedes any earlier analysis for checkout
                self.context.last_analysis = None;
                self.transition(FlowState::Synthesizing);
                let audio = self.speak(&text).await;
                self.transition(FlowState::Idle);
                Ok(DispatchOutcome::Spoken {
                    request,
                    raw,
                    text,
                    audio,
                })
            }
        }
    }

    /// Best-effort speech; failures are logged and swallowed.
    async fn speak(&self, text: &str) -> Option<PathBuf> {
        match self.synthesizer.synthesize(text, &self.speech_path).await {
            Ok(path) => path,
            Err(e) => {
                log::warn!("⚠️ Could not synthesize response: {}", e);
                None
            }
        }
    }

    /// Build the checkout arguments for the candidate at 1-based `pick`.
    pub fn build_checkout(&self, pick: Option<usize>) -> Result<CheckoutRequest> {
        let analysis = self.context.last_analysis.as_ref().ok_or_else(|| {
            ConciergeError::InvalidInput("No structured analysis to check out".into())
        })?;

        let pick = pick.unwrap_or(1);
        let candidate = if analysis.rarity_scores.is_empty() {
            None
        } else {
            Some(analysis.candidate(pick).ok_or_else(|| {
                ConciergeError::InvalidInput(format!(
                    "Pick must be between 1 and {}, got {}",
                    analysis.rarity_scores.len(),
                    pick
                ))
            })?)
        };

        let mut metadata = Map::new();
        metadata.insert("source".into(), json!(CHECKOUT_SOURCE));
        metadata.insert("analysis".into(), json!(analysis.summary));

        Ok(CheckoutRequest {
            collection_id: analysis
                .collection_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| self.context.form.collection_slug.trim())
                .to_string(),
            action: CheckoutRequest::ACTION.to_string(),
            token_id: candidate.and_then(|c| c.token_id.clone()),
            buyer_email: self.context.form.buyer_email(),
            metadata,
            price: candidate.and_then(|c| c.price),
        })
    }

    /// Ask the transaction agent for a checkout URL, minting through the
    /// relay when none comes back.
    pub async fn request_checkout(
        &mut self,
        pick: Option<usize>,
        qty: u32,
    ) -> Result<CheckoutOutcome> {
        validate_mint_qty(qty)?;
        let checkout = self.build_checkout(pick)?;
        let previous = self.state;
        self.transition(FlowState::CheckoutRequested);

        let arguments = serde_json::to_value(&checkout)
            .map_err(|e| ConciergeError::InvalidInput(format!("Unserializable checkout: {}", e)))?;
        log::info!("💳 Calling {} with {}", AGENT_TRANSACTION, arguments);

        match self.tools.call_tool(AGENT_TRANSACTION, arguments).await {
            Ok(reply) => {
                if let Some(url) = checkout_url(&reply) {
                    log::info!("✅ Checkout URL received: {}", url);
                    self.finish_checkout();
                    return Ok(CheckoutOutcome::CheckoutUrl {
                        request: checkout,
                        url,
                    });
                }
                log::info!(
                    "Transaction agent did not return checkout_url; using server-side mint fallback"
                );
            }
            Err(e) => {
                log::warn!(
                    "⚠️ Transaction agent call failed ({}); using server-side mint fallback",
                    e
                );
            }
        }

        let mint_request = MintRequest::from_checkout(&checkout, qty);
        match self.mint.mint(&mint_request).await {
            Ok(response) => {
                log::info!("✅ Server-side mint request created");
                self.finish_checkout();
                Ok(CheckoutOutcome::Minted {
                    request: mint_request,
                    response,
                })
            }
            Err(e) => {
                log::error!("❌ Server mint failed: {}", e);
                self.transition(previous);
                Err(e)
            }
        }
    }

    fn finish_checkout(&mut self) {
        self.transition(FlowState::CheckoutResolved);
        self.transition(FlowState::Idle);
    }
}

/// Non-empty `checkout_url` from a mapping or a JSON-encoded mapping.
pub fn checkout_url(reply: &Value) -> Option<String> {
    let parsed;
    let value = match reply {
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text).ok()?;
            &parsed
        }
        other => other,
    };

    value
        .get("checkout_url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}
