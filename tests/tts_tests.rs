//! Speech synthesis against a local ElevenLabs fixture

mod common;

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use common::spawn_server;
use nova_concierge::services::SpeechSynthesizer;
use nova_concierge::tts::{ElevenLabsTTS, TTSConfig};
use nova_concierge::ConciergeError;

const FAKE_MP3: &[u8] = b"ID3\x03\x00fake-mpeg-frames";

#[derive(Clone, Default)]
struct TtsFixture {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

async fn speak(
    State(fixture): State<TtsFixture>,
    Path(voice): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let key = headers
        .get("xi-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    fixture
        .requests
        .lock()
        .unwrap()
        .push((voice.clone(), key.clone(), body));

    if key.as_deref() != Some("eleven-test") {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    ([("content-type", "audio/mpeg")], Body::from(FAKE_MP3)).into_response()
}

async fn start() -> (String, TtsFixture) {
    let fixture = TtsFixture::default();
    let app = Router::new()
        .route("/text-to-speech/:voice", post(speak))
        .with_state(fixture.clone());
    (spawn_server(app).await, fixture)
}

fn tts(base_url: String, key: &str) -> ElevenLabsTTS {
    ElevenLabsTTS::with_config(
        Some(key.to_string()),
        Some("voice-123".to_string()),
        TTSConfig {
            base_url,
            ..Default::default()
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_speech_written_to_file() {
    let (base, fixture) = start().await;
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("reply.mp3");

    let path = tts(base, "eleven-test")
        .synthesize("Floor price is 2.4 SOL", &destination)
        .await
        .unwrap();

    assert_eq!(path.as_deref(), Some(destination.as_path()));
    assert_eq!(std::fs::read(&destination).unwrap(), FAKE_MP3);

    let requests = fixture.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "voice-123");
    assert_eq!(requests[0].2["text"], "Floor price is 2.4 SOL");
}

#[tokio::test]
async fn test_vendor_error_is_http_error() {
    let (base, _fixture) = start().await;
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("reply.mp3");

    match tts(base, "wrong-key").synthesize("hi", &destination).await {
        Err(ConciergeError::Http { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_unconfigured_skips_network() {
    let (base, fixture) = start().await;
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("reply.mp3");

    let tts = ElevenLabsTTS::with_config(
        Some("eleven-test".to_string()),
        None,
        TTSConfig {
            base_url: base,
            ..Default::default()
        },
    )
    .unwrap();

    assert!(tts.synthesize("hi", &destination).await.unwrap().is_none());
    assert!(fixture.requests.lock().unwrap().is_empty());
    assert!(!destination.exists());
}
