//! MCP tool host client.
//!
//! Every operation opens its own session, performs the handshake, runs one
//! logical request and closes the session again. Nothing is pooled or retried.

mod session;
pub mod types;

pub use session::McpSession;
pub use types::{InitializeResult, ServerInfo, ToolDescriptor};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::{ConciergeError, Result};
use crate::services::ToolHost;

/// Reserved tool name of the NFT analysis agent.
pub const AGENT_NFT_ANALYST: &str = "nft-analyst";
/// Reserved tool name of the transaction (checkout) agent.
pub const AGENT_TRANSACTION: &str = "transaction-agent";

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout for tool calls
    pub call_timeout: Duration,
    /// Per-request timeout for discovery
    pub list_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
            list_timeout: Duration::from_secs(30),
        }
    }
}

pub struct McpClient {
    http: Client,
    endpoint: String,
    token: Option<String>,
    options: ClientOptions,
}

impl McpClient {
    pub fn new(endpoint: &str, token: Option<String>) -> Self {
        Self::with_options(endpoint, token, ClientOptions::default())
    }

    pub fn with_options(endpoint: &str, token: Option<String>, options: ClientOptions) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            options,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// List the tools the host currently advertises, in registry order.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let mut session = self.open(self.options.list_timeout).await?;
        let tools = session.list_tools().await;
        session.close().await;

        let tools = tools?;
        log::info!("🧰 Found {} tools at {}", tools.len(), self.endpoint);
        Ok(tools)
    }

    /// Invoke `name` with `arguments`, bounding each request by `timeout`.
    pub async fn call_tool_with_timeout(
        &self,
        name: &str,
        arguments: Value,
        timeout: Duration,
    ) -> Result<Value> {
        log::info!("📞 Calling tool '{}'", name);
        let mut session = self.open(timeout).await?;
        let result = session.call_tool(name, arguments).await;
        session.close().await;

        invocation_result(name, &result?)
    }

    async fn open(&self, timeout: Duration) -> Result<McpSession> {
        McpSession::open(
            self.http.clone(),
            &self.endpoint,
            self.token.as_deref(),
            timeout,
        )
        .await
    }
}

#[async_trait]
impl ToolHost for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        McpClient::list_tools(self).await
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        self.call_tool_with_timeout(name, arguments, self.options.call_timeout)
            .await
    }
}

/// Reduce a `tools/call` result to the value the tool produced.
///
/// Prefers `structuredContent`; otherwise the text of the `content` items
/// (one item as-is, several joined by newlines); otherwise the whole result.
/// A result flagged `isError` becomes an error carrying that text.
pub fn invocation_result(name: &str, result: &Value) -> Result<Value> {
    let texts: Vec<&str> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        let detail = if texts.is_empty() {
            result.to_string()
        } else {
            texts.join("\n")
        };
        return Err(ConciergeError::AgentCall(format!(
            "Tool '{}' reported an error: {}",
            name, detail
        )));
    }

    if let Some(structured) = result.get("structuredContent") {
        return Ok(structured.clone());
    }

    match texts.as_slice() {
        [] => Ok(result.clone()),
        [single] => Ok(Value::String(single.to_string())),
        many => Ok(Value::String(many.join("\n"))),
    }
}
