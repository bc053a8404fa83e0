//! Voice-first concierge front-end.
//!
//! Captures a request by transcription or typed text, hands it to agents on an
//! MCP tool host, and either renders a structured NFT analysis or speaks the
//! agent's answer. Structured results can be taken to checkout, falling back
//! to a server-side mint relay.

pub mod classifier;
pub mod concierge;
pub mod config;
pub mod error;
pub mod mcp;
pub mod mint;
pub mod render;
pub mod services;
pub mod stt;
pub mod tts;

pub use classifier::{normalize, AgentReply, StructuredAnalysis};
pub use concierge::{CheckoutOutcome, Concierge, DispatchOutcome, FlowState};
pub use error::{ConciergeError, Result};
