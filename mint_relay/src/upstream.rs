use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of the upstream server-side mint call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamMint {
    pub quantity: i64,
    pub metadata: Map<String, Value>,
    pub buyer_email: Option<String>,
    pub token_id: Option<String>,
}

/// Client for the Crossmint collections API.
pub struct CrossmintClient {
    client: Client,
    config: RelayConfig,
}

impl CrossmintClient {
    pub fn new(config: RelayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// `{api_base}/collections/{collection_id}/nfts`, with the id escaped as one path segment.
    pub fn mint_url(&self, collection_id: &str) -> Result<Url> {
        let mut url = self.config.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| RelayError::Config("API base cannot hold a path".into()))?
            .pop_if_empty()
            .extend(["collections", collection_id, "nfts"]);
        Ok(url)
    }

    /// Forward a mint; any non-success answer becomes `RelayError::Upstream`.
    pub async fn mint(&self, collection_id: &str, body: &UpstreamMint) -> Result<Value> {
        let url = self.mint_url(collection_id)?;
        log::info!("🪙 Minting {} from collection {}", body.quantity, collection_id);

        let response = self
            .client
            .post(url)
            .bearer_auth(self.config.server_key())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                log::error!("❌ Crossmint unreachable: {}", e);
                RelayError::Upstream {
                    status_code: None,
                    text: e.to_string(),
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| RelayError::Upstream {
            status_code: Some(status.as_u16()),
            text: e.to_string(),
        })?;

        if !status.is_success() {
            log::error!("❌ Crossmint returned {}: {}", status, text);
            return Err(RelayError::Upstream {
                status_code: Some(status.as_u16()),
                text,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            log::error!("❌ Crossmint returned non-JSON body: {}", e);
            RelayError::Upstream {
                status_code: Some(status.as_u16()),
                text,
            }
        })
    }
}
