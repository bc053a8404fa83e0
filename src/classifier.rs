//! Classification of tool replies.
//!
//! Agents answer with a plain string, a JSON document encoded in a string, or
//! a JSON object. [`normalize`] turns any of these into an [`AgentReply`]: a
//! structured analysis when the mapping carries `rarity_scores` or
//! `floor_history`, otherwise text suitable for speech.

use serde::Serialize;
use serde_json::{Map, Value};

pub const RARITY_KEY: &str = "rarity_scores";
pub const FLOOR_KEY: &str = "floor_history";

#[derive(Debug, Clone, PartialEq)]
pub enum AgentReply {
    Structured(StructuredAnalysis),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RarityScore {
    pub token_id: Option<String>,
    pub rank: Option<i64>,
    pub score: Option<f64>,
    pub traits: Vec<String>,
    pub image: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloorPoint {
    pub timestamp: String,
    pub floor_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredAnalysis {
    pub rarity_scores: Vec<RarityScore>,
    pub floor_history: Vec<FloorPoint>,
    pub collection_id: Option<String>,
    pub summary: Option<String>,
    /// The mapping the analysis was read from, untouched.
    #[serde(skip)]
    pub raw: Map<String, Value>,
}

impl StructuredAnalysis {
    /// Read an analysis out of a mapping. Malformed entries degrade to defaults.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let items = |key: &str| -> Vec<Value> {
            map.get(key)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        };

        Self {
            rarity_scores: items(RARITY_KEY).iter().map(RarityScore::from_value).collect(),
            floor_history: items(FLOOR_KEY).iter().map(FloorPoint::from_value).collect(),
            collection_id: map.get("collection_id").and_then(lenient_string),
            summary: map.get("summary").and_then(lenient_string),
            raw: map.clone(),
        }
    }

    /// Candidate at a 1-based position in the rarity ranking.
    pub fn candidate(&self, position: usize) -> Option<&RarityScore> {
        position
            .checked_sub(1)
            .and_then(|idx| self.rarity_scores.get(idx))
    }
}

impl RarityScore {
    fn from_value(value: &Value) -> Self {
        let field = |key: &str| value.get(key);
        Self {
            token_id: field("token_id").and_then(lenient_string),
            rank: field("rank").and_then(lenient_i64),
            score: field("score").and_then(lenient_f64),
            traits: match field("traits") {
                Some(Value::Array(items)) => items.iter().filter_map(lenient_string).collect(),
                Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
                _ => Vec::new(),
            },
            image: field("image").and_then(lenient_string),
            price: field("price").and_then(lenient_f64),
        }
    }
}

impl FloorPoint {
    fn from_value(value: &Value) -> Self {
        Self {
            timestamp: value
                .get("timestamp")
                .and_then(lenient_string)
                .unwrap_or_default(),
            floor_price: value.get("floor_price").and_then(lenient_f64),
        }
    }
}

/// Classify a raw tool reply. Total: every input yields a reply.
pub fn normalize(raw: &Value) -> AgentReply {
    let parsed;
    let candidate = match raw {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => {
                parsed = value;
                &parsed
            }
            Err(_) => return AgentReply::Text(text.clone()),
        },
        other => other,
    };

    match candidate {
        Value::Object(map) if map.contains_key(RARITY_KEY) || map.contains_key(FLOOR_KEY) => {
            AgentReply::Structured(StructuredAnalysis::from_map(map))
        }
        Value::Object(map) => AgentReply::Text(text_of_mapping(map)),
        _ => AgentReply::Text(display_raw(raw)),
    }
}

/// Spoken text for a mapping: `text`, then `summary`, then the JSON itself.
fn text_of_mapping(map: &Map<String, Value>) -> String {
    ["text", "summary"]
        .iter()
        .find_map(|key| map.get(*key).and_then(truthy_text))
        .unwrap_or_else(|| Value::Object(map.clone()).to_string())
}

/// Text of a value that counts as present: non-empty strings and
/// collections, non-zero numbers, `true`.
fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Array(items) if !items.is_empty() => Some(value.to_string()),
        Value::Object(map) if !map.is_empty() => Some(value.to_string()),
        _ => None,
    }
}

fn display_raw(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn lenient_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
