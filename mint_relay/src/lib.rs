//! Server-side mint relay.
//!
//! Accepts `POST /api/mint` from the concierge and forwards it to the Crossmint
//! collections API with the server key, which never leaves this process.

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub mod config;
pub mod error;
pub mod handlers;
pub mod upstream;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use upstream::CrossmintClient;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub crossmint: Arc<CrossmintClient>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Result<Self> {
        Ok(Self {
            crossmint: Arc::new(CrossmintClient::new(config)?),
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/mint", post(handlers::mint))
        .route("/health", get(handlers::health))
        .with_state(state)
}
