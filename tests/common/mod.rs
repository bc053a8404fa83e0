//! Common test utilities
//!
//! In-process HTTP fixtures on ephemeral ports standing in for the MCP tool
//! host, the speech vendors and the mint relay.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Serve `app` on 127.0.0.1 with an OS-assigned port and return its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind ephemeral port");
    let addr = listener.local_addr().expect("Should have local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Fixture server failed");
    });
    format!("http://{}", addr)
}

/// Base URL on which nothing is listening.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// =============================================================================
// MCP tool host
// =============================================================================

/// What the fake MCP host saw.
#[derive(Debug, Default)]
pub struct McpLog {
    /// JSON-RPC methods in arrival order
    pub methods: Vec<String>,
    /// Session ids handed out by `initialize`
    pub opened: Vec<String>,
    /// Session ids released with DELETE
    pub closed: Vec<String>,
    /// Authorization header of every POST
    pub authorization: Vec<Option<String>>,
    /// `tools/call` requests as (name, arguments)
    pub calls: Vec<(String, Value)>,
}

#[derive(Clone)]
pub struct FakeMcpHost {
    /// Registry advertised by `tools/list`
    pub tools: Vec<Value>,
    /// Tools per `tools/list` page
    pub page_size: usize,
    /// Reply with `text/event-stream` instead of JSON
    pub sse: bool,
    /// Fail `initialize` with a JSON-RPC error after assigning a session
    pub fail_initialize: bool,
    /// `tools/call` result object per tool name
    pub results: HashMap<String, Value>,
    pub log: Arc<Mutex<McpLog>>,
}

impl FakeMcpHost {
    pub fn new(tool_names: &[&str]) -> Self {
        let tools = tool_names
            .iter()
            .map(|name| {
                json!({
                    "name": name,
                    "description": format!("{} agent", name),
                    "inputSchema": {"type": "object", "properties": {"input": {"type": "string"}}}
                })
            })
            .collect();

        Self {
            tools,
            page_size: 100,
            sse: false,
            fail_initialize: false,
            results: HashMap::new(),
            log: Arc::new(Mutex::new(McpLog::default())),
        }
    }

    /// Answer `tools/call` for `name` with a single text content item.
    pub fn with_text(mut self, name: &str, text: &str) -> Self {
        self.results.insert(
            name.to_string(),
            json!({"content": [{"type": "text", "text": text}], "isError": false}),
        );
        self
    }

    /// Answer `tools/call` for `name` with a raw result object.
    pub fn with_result(mut self, name: &str, result: Value) -> Self {
        self.results.insert(name.to_string(), result);
        self
    }

    /// Start the host; returns the endpoint URL and the request log.
    pub async fn start(self) -> (String, Arc<Mutex<McpLog>>) {
        let log = self.log.clone();
        let app = Router::new()
            .route("/mcp", post(mcp_post).delete(mcp_delete))
            .with_state(self);
        let base = spawn_server(app).await;
        (format!("{}/mcp", base), log)
    }
}

async fn mcp_post(
    State(host): State<FakeMcpHost>,
    headers: HeaderMap,
    Json(message): Json<Value>,
) -> Response {
    let method = message["method"].as_str().unwrap_or_default().to_string();
    let id = message.get("id").cloned();
    let mut new_session = None;

    let reply = {
        let mut log = host.log.lock().unwrap();
        log.methods.push(method.clone());
        log.authorization.push(header(&headers, "authorization"));

        match method.as_str() {
            "initialize" => {
                let session = format!("session-{}", log.opened.len() + 1);
                log.opened.push(session.clone());
                new_session = Some(session);
                if host.fail_initialize {
                    json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32603, "message": "host is starting"}})
                } else {
                    json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "result": {
                            "protocolVersion": "2025-06-18",
                            "capabilities": {"tools": {}},
                            "serverInfo": {"name": "fake-host", "version": "0.0.1"}
                        }
                    })
                }
            }
            "notifications/initialized" => return StatusCode::ACCEPTED.into_response(),
            "tools/list" => {
                let start: usize = message["params"]["cursor"]
                    .as_str()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(0);
                let end = (start + host.page_size).min(host.tools.len());
                let mut result = json!({"tools": host.tools[start..end].to_vec()});
                if end < host.tools.len() {
                    result["nextCursor"] = json!(end.to_string());
                }
                json!({"jsonrpc": "2.0", "id": id, "result": result})
            }
            "tools/call" => {
                let name = message["params"]["name"].as_str().unwrap_or_default();
                log.calls
                    .push((name.to_string(), message["params"]["arguments"].clone()));
                match host.results.get(name) {
                    Some(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
                    None => json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": {"code": -32602, "message": format!("Unknown tool: {}", name)}
                    }),
                }
            }
            other => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": format!("Method not found: {}", other)}
            }),
        }
    };

    let mut response = if host.sse {
        let body = format!(
            "event: message\ndata: {}\n\nevent: message\ndata: {}\n\n",
            json!({"jsonrpc": "2.0", "method": "notifications/progress", "params": {"progress": 1}}),
            reply
        );
        ([("content-type", "text/event-stream")], body).into_response()
    } else {
        Json(reply).into_response()
    };

    if let Some(session) = new_session {
        response
            .headers_mut()
            .insert("mcp-session-id", session.parse().unwrap());
    }
    response
}

async fn mcp_delete(State(host): State<FakeMcpHost>, headers: HeaderMap) -> StatusCode {
    if let Some(session) = header(&headers, "mcp-session-id") {
        host.log.lock().unwrap().closed.push(session);
    }
    StatusCode::OK
}

// =============================================================================
// Mint relay
// =============================================================================

#[derive(Clone)]
pub struct FakeRelay {
    pub status: StatusCode,
    pub reply: Value,
    pub received: Arc<Mutex<Vec<Value>>>,
}

impl FakeRelay {
    pub fn new(status: StatusCode, reply: Value) -> Self {
        Self {
            status,
            reply,
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn start(self) -> (String, Arc<Mutex<Vec<Value>>>) {
        let received = self.received.clone();
        let app = Router::new()
            .route("/api/mint", post(relay_mint))
            .with_state(self);
        (spawn_server(app).await, received)
    }
}

async fn relay_mint(State(relay): State<FakeRelay>, body: Bytes) -> (StatusCode, Json<Value>) {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    relay.received.lock().unwrap().push(body);
    (relay.status, Json(relay.reply.clone()))
}
