//! A single MCP session over the Streamable HTTP transport.
//!
//! Requests are JSON-RPC 2.0 messages POSTed to the endpoint. The server
//! assigns a session id in the `Mcp-Session-Id` header of the `initialize`
//! response, and every later request echoes it. Replies arrive either as a
//! plain JSON body or as a `text/event-stream` whose `data:` lines carry the
//! JSON-RPC message.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

use super::types::{InitializeResult, ToolDescriptor, PROTOCOL_VERSION};
use crate::error::{ConciergeError, Result};

const SESSION_HEADER: &str = "Mcp-Session-Id";
const PROTOCOL_HEADER: &str = "MCP-Protocol-Version";

pub struct McpSession {
    client: Client,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
    session_id: Option<String>,
    protocol_version: Option<String>,
    next_id: u64,
}

impl McpSession {
    /// Open a session and complete the handshake.
    ///
    /// If the handshake fails the partially opened session is released before
    /// the error is returned.
    pub async fn open(
        client: Client,
        endpoint: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut session = Self {
            client,
            endpoint: endpoint.to_string(),
            token: token.map(str::to_string),
            timeout,
            session_id: None,
            protocol_version: None,
            next_id: 1,
        };

        match session.initialize().await {
            Ok(info) => {
                log::debug!(
                    "MCP session {:?} initialized with {} {:?}",
                    session.session_id,
                    info.server_info.name,
                    info.server_info.version
                );
                Ok(session)
            }
            Err(e) => {
                log::warn!("⚠️ MCP handshake with {} failed: {}", endpoint, e);
                session.close().await;
                Err(e)
            }
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    async fn initialize(&mut self) -> Result<InitializeResult> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        let result = self.request("initialize", params).await?;
        let info: InitializeResult = serde_json::from_value(result).map_err(|e| {
            ConciergeError::AgentCall(format!("Invalid initialize response: {}", e))
        })?;
        self.protocol_version = Some(info.protocol_version.clone());

        self.notify("notifications/initialized").await?;
        Ok(info)
    }

    /// Fetch the full tool registry, following `nextCursor` pages in order.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;

            let page = result
                .get("tools")
                .cloned()
                .ok_or_else(|| ConciergeError::AgentCall("Missing tools in response".into()))?;
            let page: Vec<ToolDescriptor> = serde_json::from_value(page)
                .map_err(|e| ConciergeError::AgentCall(format!("Failed to parse tools: {}", e)))?;
            tools.extend(page);

            let next = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            if next.is_none() || next == cursor {
                break;
            }
            cursor = next;
        }

        Ok(tools)
    }

    /// Invoke a tool and return its raw `result` object.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value> {
        self.request(
            "tools/call",
            json!({
                "name": name,
                "arguments": arguments
            }),
        )
        .await
    }

    /// Release the session on the server. Failures are logged, not returned.
    pub async fn close(self) {
        let Some(session_id) = self.session_id.as_deref() else {
            return;
        };

        let request = self
            .client
            .delete(&self.endpoint)
            .header(SESSION_HEADER, session_id)
            .timeout(self.timeout);

        match self.authorize(request).send().await {
            Ok(response)
                if response.status().is_success()
                    || response.status() == StatusCode::METHOD_NOT_ALLOWED =>
            {
                log::debug!("MCP session {} closed", session_id);
            }
            Ok(response) => {
                log::warn!(
                    "⚠️ MCP session {} close returned {}",
                    session_id,
                    response.status()
                );
            }
            Err(e) => {
                log::warn!("⚠️ MCP session {} close failed: {}", session_id, e);
            }
        }
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });

        let response = self
            .post(&body)
            .send()
            .await
            .map_err(|e| ConciergeError::AgentCall(format!("{} request failed: {}", method, e)))?;

        if self.session_id.is_none() {
            self.session_id = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
        }

        let status = response.status();
        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("text/event-stream"))
            .unwrap_or(false);
        let text = response
            .text()
            .await
            .map_err(|e| ConciergeError::AgentCall(format!("{} response unreadable: {}", method, e)))?;

        if !status.is_success() {
            return Err(ConciergeError::AgentCall(format!(
                "{} failed with HTTP {}: {}",
                method,
                status.as_u16(),
                text
            )));
        }

        let message = if is_stream {
            find_sse_response(&text, id).ok_or_else(|| {
                ConciergeError::AgentCall(format!("No response to {} in event stream", method))
            })?
        } else {
            serde_json::from_str::<Value>(&text).map_err(|e| {
                ConciergeError::AgentCall(format!("Invalid JSON-RPC response to {}: {}", method, e))
            })?
        };

        if let Some(error) = message.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(-1);
            let detail = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            return Err(ConciergeError::AgentCall(format!(
                "{} failed (code {}): {}",
                method, code, detail
            )));
        }

        message
            .get("result")
            .cloned()
            .ok_or_else(|| ConciergeError::AgentCall(format!("Missing result in {} response", method)))
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": {}
        });

        let response = self
            .post(&body)
            .send()
            .await
            .map_err(|e| ConciergeError::AgentCall(format!("{} failed: {}", method, e)))?;

        let status = response.status();
        if status != StatusCode::ACCEPTED && !status.is_success() {
            return Err(ConciergeError::AgentCall(format!(
                "{} rejected with HTTP {}",
                method,
                status.as_u16()
            )));
        }
        Ok(())
    }

    fn post(&self, body: &Value) -> RequestBuilder {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json, text/event-stream")
            .timeout(self.timeout)
            .json(body);

        if let Some(id) = &self.session_id {
            request = request.header(SESSION_HEADER, id);
        }
        if let Some(version) = &self.protocol_version {
            request = request.header(PROTOCOL_HEADER, version);
        }
        self.authorize(request)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Find the JSON-RPC message answering request `id` in an SSE body.
///
/// Events are separated by blank lines; multi-line `data:` fields are joined
/// with newlines. Server notifications interleaved in the stream are skipped.
fn find_sse_response(body: &str, id: u64) -> Option<Value> {
    let mut data = String::new();

    let take_event = |data: &mut String| -> Option<Value> {
        if data.is_empty() {
            return None;
        }
        let parsed = serde_json::from_str::<Value>(data).ok();
        data.clear();
        parsed.filter(|msg| msg.get("id").and_then(Value::as_u64) == Some(id))
    };

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if let Some(msg) = take_event(&mut data) {
                return Some(msg);
            }
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }

    take_event(&mut data)
}
