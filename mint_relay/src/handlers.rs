use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Map, Value};

use crate::error::{RelayError, Result};
use crate::upstream::UpstreamMint;
use crate::AppState;

/// POST /api/mint
///
/// The body is read as JSON whatever the content type says.
pub async fn mint(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>> {
    let body: Value = serde_json::from_slice(&body).map_err(|e| {
        log::warn!("⚠️ Rejected mint request with invalid JSON: {}", e);
        RelayError::BadRequest("invalid JSON body".into())
    })?;

    let (collection_id, upstream) = parse_mint(&body)?;
    let response = state.crossmint.mint(&collection_id, &upstream).await?;
    log::info!("✅ Mint request forwarded for collection {}", collection_id);
    Ok(Json(response))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Validate a mint body and map it to the upstream payload.
pub fn parse_mint(body: &Value) -> Result<(String, UpstreamMint)> {
    let collection_id = body
        .get("collection_id")
        .and_then(collection_text)
        .ok_or_else(|| RelayError::BadRequest("collection_id required".into()))?;

    let quantity = match body.get("qty") {
        None | Some(Value::Null) => 1,
        Some(qty) => qty
            .as_i64()
            .ok_or_else(|| RelayError::BadRequest("qty must be an integer".into()))?,
    };
    if quantity < 1 {
        return Err(RelayError::BadRequest("qty must be >= 1".into()));
    }

    let metadata = body
        .get("metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_else(Map::new);

    Ok((
        collection_id,
        UpstreamMint {
            quantity,
            metadata,
            buyer_email: string_field(body, "buyer_email"),
            token_id: string_field(body, "token_id"),
        },
    ))
}

/// Non-empty strings as-is, non-zero numbers in their JSON form.
fn collection_text(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}
