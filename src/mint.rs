use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::{ConciergeError, Result};
use crate::services::MintService;

/// Arguments sent to the transaction agent to create a checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub collection_id: String,
    pub action: String,
    pub token_id: Option<String>,
    pub buyer_email: Option<String>,
    pub metadata: Map<String, Value>,
    pub price: Option<f64>,
}

impl CheckoutRequest {
    pub const ACTION: &'static str = "create_checkout";
}

/// Body of `POST /api/mint` on the mint relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintRequest {
    pub collection_id: String,
    pub token_id: Option<String>,
    pub buyer_email: Option<String>,
    pub metadata: Map<String, Value>,
    pub qty: u32,
}

impl MintRequest {
    /// Mint request carrying the same fields as a checkout that produced no URL.
    pub fn from_checkout(checkout: &CheckoutRequest, qty: u32) -> Self {
        Self {
            collection_id: checkout.collection_id.clone(),
            token_id: checkout.token_id.clone(),
            buyer_email: checkout.buyer_email.clone(),
            metadata: checkout.metadata.clone(),
            qty,
        }
    }
}

/// HTTP client for the mint relay service.
pub struct MintRelayClient {
    client: Client,
    base_url: String,
}

impl MintRelayClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConciergeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn mint_url(&self) -> String {
        format!("{}/api/mint", self.base_url)
    }
}

#[async_trait]
impl MintService for MintRelayClient {
    async fn mint(&self, request: &MintRequest) -> Result<Value> {
        log::info!(
            "🪙 Requesting server-side mint of {} from {}",
            request.qty,
            request.collection_id
        );

        let response = self
            .client
            .post(self.mint_url())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("❌ Server mint failed: {} {}", status.as_u16(), body);
            return Err(ConciergeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ConciergeError::Transport(format!("Invalid JSON from mint relay: {}", e)))
    }
}
