//! MCP client against an in-process Streamable HTTP host

mod common;

use common::{dead_url, FakeMcpHost};
use nova_concierge::mcp::McpClient;
use nova_concierge::{normalize, AgentReply, ConciergeError};
use serde_json::json;

#[tokio::test]
async fn test_list_tools_follows_pages_in_order() {
    let mut host = FakeMcpHost::new(&[
        "nft-analyst",
        "transaction-agent",
        "weather",
        "news",
        "calendar",
    ]);
    host.page_size = 2;
    let (endpoint, log) = host.start().await;
    let client = McpClient::new(&endpoint, None);

    let first = client.list_tools().await.unwrap();
    let second = client.list_tools().await.unwrap();

    let names: Vec<&str> = first.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["nft-analyst", "transaction-agent", "weather", "news", "calendar"]
    );
    assert_eq!(first, second);
    assert_eq!(first[0].description.as_deref(), Some("nft-analyst agent"));
    assert_eq!(first[0].parameter_names(), "input");

    let log = log.lock().unwrap();
    assert_eq!(
        log.methods[..5],
        [
            "initialize",
            "notifications/initialized",
            "tools/list",
            "tools/list",
            "tools/list"
        ]
    );
    assert_eq!(log.opened.len(), 2);
    assert_eq!(log.closed, log.opened);
}

#[tokio::test]
async fn test_call_tool_returns_text_content() {
    let (endpoint, log) = FakeMcpHost::new(&["weather"])
        .with_text("weather", "Sunny with a chance of NFTs")
        .start()
        .await;
    let client = McpClient::new(&endpoint, None);

    let reply = client
        .call_tool_with_timeout("weather", json!({"input": "forecast?"}), std::time::Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(reply, json!("Sunny with a chance of NFTs"));
    let log = log.lock().unwrap();
    assert_eq!(log.calls, vec![("weather".to_string(), json!({"input": "forecast?"}))]);
    assert_eq!(log.closed, vec!["session-1"]);
}

#[tokio::test]
async fn test_event_stream_responses() {
    let analysis = r#"{"rarity_scores":[{"token_id":"7","rank":1}],"floor_history":[]}"#;
    let mut host = FakeMcpHost::new(&["nft-analyst"]).with_text("nft-analyst", analysis);
    host.sse = true;
    let (endpoint, _log) = host.start().await;
    let client = McpClient::new(&endpoint, None);

    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), 1);

    let reply = nova_concierge::services::ToolHost::call_tool(
        &client,
        "nft-analyst",
        json!({"collection_slug": "solana-skyliner"}),
    )
    .await
    .unwrap();

    match normalize(&reply) {
        AgentReply::Structured(analysis) => {
            assert_eq!(analysis.rarity_scores[0].token_id.as_deref(), Some("7"));
        }
        other => panic!("expected structured analysis, got {:?}", other),
    }
}

#[tokio::test]
async fn test_structured_content_preferred() {
    let (endpoint, _log) = FakeMcpHost::new(&["nft-analyst"])
        .with_result(
            "nft-analyst",
            json!({
                "content": [{"type": "text", "text": "see structured content"}],
                "structuredContent": {"rarity_scores": [], "summary": "quiet market"}
            }),
        )
        .start()
        .await;
    let client = McpClient::new(&endpoint, None);

    let reply = nova_concierge::services::ToolHost::call_tool(&client, "nft-analyst", json!({}))
        .await
        .unwrap();
    assert_eq!(reply, json!({"rarity_scores": [], "summary": "quiet market"}));
}

#[tokio::test]
async fn test_bearer_token_sent_on_every_request() {
    let (endpoint, log) = FakeMcpHost::new(&["weather"]).start().await;
    let client = McpClient::new(&endpoint, Some("coral-token".to_string()));

    client.list_tools().await.unwrap();

    let log = log.lock().unwrap();
    assert!(!log.authorization.is_empty());
    assert!(log
        .authorization
        .iter()
        .all(|auth| auth.as_deref() == Some("Bearer coral-token")));
}

#[tokio::test]
async fn test_no_authorization_without_token() {
    let (endpoint, log) = FakeMcpHost::new(&["weather"]).start().await;
    let client = McpClient::new(&endpoint, Some(String::new()));

    client.list_tools().await.unwrap();

    assert!(log.lock().unwrap().authorization.iter().all(Option::is_none));
}

#[tokio::test]
async fn test_failed_handshake_still_releases_session() {
    let mut host = FakeMcpHost::new(&["weather"]);
    host.fail_initialize = true;
    let (endpoint, log) = host.start().await;
    let client = McpClient::new(&endpoint, None);

    let err = client.list_tools().await.unwrap_err();
    assert!(matches!(err, ConciergeError::AgentCall(_)), "got {:?}", err);

    let log = log.lock().unwrap();
    assert_eq!(log.methods, vec!["initialize"]);
    assert_eq!(log.closed, vec!["session-1"]);
}

#[tokio::test]
async fn test_unknown_tool_is_agent_error_and_session_closed() {
    let (endpoint, log) = FakeMcpHost::new(&["weather"]).start().await;
    let client = McpClient::new(&endpoint, None);

    let err = nova_concierge::services::ToolHost::call_tool(&client, "missing", json!({}))
        .await
        .unwrap_err();
    match err {
        ConciergeError::AgentCall(message) => assert!(message.contains("Unknown tool")),
        other => panic!("expected AgentCall, got {:?}", other),
    }
    assert_eq!(log.lock().unwrap().closed, vec!["session-1"]);
}

#[tokio::test]
async fn test_tool_error_flag_is_agent_error() {
    let (endpoint, _log) = FakeMcpHost::new(&["transaction-agent"])
        .with_result(
            "transaction-agent",
            json!({"content": [{"type": "text", "text": "wallet locked"}], "isError": true}),
        )
        .start()
        .await;
    let client = McpClient::new(&endpoint, None);

    let err = nova_concierge::services::ToolHost::call_tool(&client, "transaction-agent", json!({}))
        .await
        .unwrap_err();
    match err {
        ConciergeError::AgentCall(message) => assert!(message.contains("wallet locked")),
        other => panic!("expected AgentCall, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_host() {
    let client = McpClient::new(&format!("{}/mcp", dead_url().await), None);
    assert!(client.list_tools().await.is_err());
}
