use strum::Display;

use super::request::NftQueryForm;
use crate::classifier::StructuredAnalysis;
use crate::mcp::{ToolDescriptor, AGENT_NFT_ANALYST};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FlowState {
    Idle,
    Captured,
    Discovering,
    ToolsListed,
    Dispatching,
    ResponseReceived,
    Rendered,
    Synthesizing,
    CheckoutRequested,
    CheckoutResolved,
}

/// What the user has picked in the agent selector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolSelection {
    /// Nothing chosen, or "manual input": free text goes to the analyst.
    #[default]
    Manual,
    Tool(String),
}

impl ToolSelection {
    pub fn name(&self) -> Option<&str> {
        match self {
            ToolSelection::Manual => None,
            ToolSelection::Tool(name) => Some(name),
        }
    }

    /// The NFT analyst gets the structured form instead of the transcript.
    pub fn uses_structured_form(&self) -> bool {
        self.name() == Some(AGENT_NFT_ANALYST)
    }
}

/// Everything the flow remembers between user actions.
#[derive(Debug, Default)]
pub struct SessionContext {
    pub transcript: Option<String>,
    pub tools: Vec<ToolDescriptor>,
    pub selection: ToolSelection,
    pub form: NftQueryForm,
    pub last_analysis: Option<StructuredAnalysis>,
}

impl SessionContext {
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}
