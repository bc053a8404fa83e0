use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use strum::{Display, EnumString};

use crate::error::{ConciergeError, Result};
use crate::mcp::AGENT_NFT_ANALYST;

pub const LIMIT_RANGE: std::ops::RangeInclusive<u32> = 1..=100;
pub const MINT_QTY_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    #[default]
    Solana,
    Ethereum,
}

/// Fields of the structured NFT search form.
#[derive(Debug, Clone, PartialEq)]
pub struct NftQueryForm {
    pub collection_slug: String,
    pub chain: Chain,
    pub max_price: f64,
    /// Comma-separated trait filters as typed by the user
    pub traits: String,
    pub limit: u32,
    pub buyer_email: Option<String>,
}

impl Default for NftQueryForm {
    fn default() -> Self {
        Self {
            collection_slug: "solana-skyliner".to_string(),
            chain: Chain::Solana,
            max_price: 3.0,
            traits: String::new(),
            limit: 20,
            buyer_email: None,
        }
    }
}

impl NftQueryForm {
    /// Trait filters split on commas, trimmed, empties dropped.
    pub fn trait_list(&self) -> Vec<String> {
        self.traits
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.collection_slug.trim().is_empty() {
            return Err(ConciergeError::InvalidInput(
                "collection slug must not be empty".into(),
            ));
        }
        if !self.max_price.is_finite() || self.max_price < 0.0 {
            return Err(ConciergeError::InvalidInput(format!(
                "max price must be a non-negative number, got {}",
                self.max_price
            )));
        }
        if !LIMIT_RANGE.contains(&self.limit) {
            return Err(ConciergeError::InvalidInput(format!(
                "limit must be between {} and {}, got {}",
                LIMIT_RANGE.start(),
                LIMIT_RANGE.end(),
                self.limit
            )));
        }
        Ok(())
    }

    /// Buyer email with blank input treated as absent
    pub fn buyer_email(&self) -> Option<String> {
        self.buyer_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
    }
}

/// A tool invocation ready to dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub target_tool: String,
    pub arguments: Map<String, Value>,
}

impl InvocationRequest {
    /// Structured search for the NFT analysis agent.
    pub fn structured(form: &NftQueryForm) -> Result<Self> {
        form.validate()?;
        let arguments = json!({
            "collection_slug": form.collection_slug.trim(),
            "chain": form.chain.to_string(),
            "max_price": form.max_price,
            "traits": form.trait_list(),
            "limit": form.limit
        });

        Ok(Self {
            target_tool: AGENT_NFT_ANALYST.to_string(),
            arguments: into_map(arguments),
        })
    }

    /// Free-text request carrying the transcript as `input`.
    pub fn unstructured(tool: Option<&str>, transcript: &str) -> Self {
        let target_tool = tool
            .filter(|t| !t.is_empty())
            .unwrap_or(AGENT_NFT_ANALYST)
            .to_string();

        Self {
            target_tool,
            arguments: into_map(json!({ "input": transcript })),
        }
    }

    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone())
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub fn validate_mint_qty(qty: u32) -> Result<()> {
    if MINT_QTY_RANGE.contains(&qty) {
        Ok(())
    } else {
        Err(ConciergeError::InvalidInput(format!(
            "mint quantity must be between {} and {}, got {}",
            MINT_QTY_RANGE.start(),
            MINT_QTY_RANGE.end(),
            qty
        )))
    }
}
