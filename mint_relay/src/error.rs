use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    BadRequest(String),

    /// Upstream answered with a failure status, or could not be reached
    /// (`status_code` is then absent).
    #[error("Crossmint error (status {status_code:?}): {text}")]
    Upstream {
        status_code: Option<u16>,
        text: String,
    },
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            RelayError::Upstream { status_code, text } => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "Crossmint error",
                    "status_code": status_code,
                    "text": text,
                })),
            )
                .into_response(),
            RelayError::Config(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
                .into_response(),
        }
    }
}
